//! Staggered reveals.
//!
//! A reveal is prepared synchronously (marker class set, child nodes
//! created) and produces an [`AnimationSequence`]: an ordered list of
//! `{target, delay, change}` steps that the
//! [`Animator`](crate::animator::Animator) plays back.
//!
//! Both variants are guarded by the `animated` marker on the parent. A second
//! preparation fails with [`FolioError::AlreadyAnimated`] before touching the
//! DOM, so repeated viewport entry never duplicates letters or re-runs a
//! cascade.

use folio_config::StaggerRevealRule;
use tracing::debug;

use crate::dom::{NodeId, Page};
use crate::error::{FolioError, Result};
use crate::selectors;

/// A single DOM mutation applied by a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleChange {
    AddClass(String),
    SetStyle { property: String, value: String },
}

impl StyleChange {
    pub fn add_class(class: &str) -> Self {
        Self::AddClass(class.to_string())
    }

    pub fn set_style(property: &str, value: &str) -> Self {
        Self::SetStyle {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn apply(&self, page: &mut dyn Page, node: NodeId) {
        match self {
            Self::AddClass(class) => page.add_class(node, class),
            Self::SetStyle { property, value } => page.set_style(node, property, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaggerStep {
    pub target: NodeId,
    /// Offset from the start of the sequence, in milliseconds.
    pub delay_ms: f64,
    pub change: StyleChange,
}

/// Ordered steps of one reveal. Steps are kept sorted by delay; equal delays
/// keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSequence {
    owner: NodeId,
    steps: Vec<StaggerStep>,
}

/// `base + i * step` for `i` in `0..count`.
pub fn stagger_delays(count: usize, base_ms: f64, step_ms: f64) -> Vec<f64> {
    (0..count).map(|i| base_ms + i as f64 * step_ms).collect()
}

impl AnimationSequence {
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            steps: Vec::new(),
        }
    }

    /// One step per target, delays from [`stagger_delays`].
    pub fn staggered(
        owner: NodeId,
        targets: &[NodeId],
        base_ms: f64,
        step_ms: f64,
        change: StyleChange,
    ) -> Self {
        let mut sequence = Self::new(owner);
        for (&target, delay_ms) in targets
            .iter()
            .zip(stagger_delays(targets.len(), base_ms, step_ms))
        {
            sequence.push(StaggerStep {
                target,
                delay_ms,
                change: change.clone(),
            });
        }
        sequence
    }

    pub fn push(&mut self, step: StaggerStep) {
        let at = self
            .steps
            .partition_point(|s| s.delay_ms <= step.delay_ms);
        self.steps.insert(at, step);
    }

    /// The element the sequence belongs to (the one carrying the marker).
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn steps(&self) -> &[StaggerStep] {
        &self.steps
    }

    pub fn delays(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.delay_ms).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn claim(page: &mut dyn Page, node: NodeId) -> Result<()> {
    if page.has_class(node, selectors::ANIMATED) {
        return Err(FolioError::AlreadyAnimated {
            marker: selectors::ANIMATED.to_string(),
        });
    }
    page.add_class(node, selectors::ANIMATED);
    Ok(())
}

/// Split `heading` into one `span.letter` per character and fade them in
/// one after another, `step_ms` apart.
///
/// Spaces become non-breaking so the hidden letters keep their layout.
pub fn prepare_letter_reveal(
    page: &mut dyn Page,
    heading: NodeId,
    step_ms: f64,
) -> Result<AnimationSequence> {
    claim(page, heading)?;
    let text = page.text(heading);
    page.set_text(heading, "");

    let mut letters = Vec::new();
    for ch in text.trim().chars() {
        let span = page.append_element(heading, "span", selectors::LETTER);
        let content = if ch == ' ' {
            "\u{a0}".to_string()
        } else {
            ch.to_string()
        };
        page.set_text(span, &content);
        page.set_style(span, "opacity", "0");
        letters.push(span);
    }
    debug!(?heading, letters = letters.len(), "letter reveal prepared");
    Ok(AnimationSequence::staggered(
        heading,
        &letters,
        0.0,
        step_ms,
        StyleChange::set_style("opacity", "1"),
    ))
}

/// Reveal the lead element (if any) and then every item inside `trigger`,
/// adding `rule.class` with a cascading delay.
pub fn prepare_stagger_reveal(
    page: &mut dyn Page,
    trigger: NodeId,
    rule: &StaggerRevealRule,
) -> Result<AnimationSequence> {
    let items = page.query_within(trigger, &rule.items);
    let lead = rule
        .lead
        .as_deref()
        .and_then(|s| page.query_within(trigger, s).into_iter().next());
    if items.is_empty() && lead.is_none() {
        return Err(FolioError::MissingElement {
            selector: rule.items.clone(),
        });
    }
    claim(page, trigger)?;

    let change = StyleChange::add_class(&rule.class);
    let mut sequence = AnimationSequence::staggered(
        trigger,
        &items,
        rule.base_delay_ms,
        rule.step_ms,
        change.clone(),
    );
    if let Some(lead) = lead {
        sequence.push(StaggerStep {
            target: lead,
            delay_ms: rule.lead_delay_ms,
            change,
        });
    }
    debug!(?trigger, items = items.len(), lead = lead.is_some(), "stagger reveal prepared");
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryPage;

    fn services_rule() -> StaggerRevealRule {
        StaggerRevealRule {
            trigger: ".services-section".to_string(),
            items: ".service-item".to_string(),
            lead: Some(".services-sticker".to_string()),
            threshold: 0.2,
            lead_delay_ms: 100.0,
            base_delay_ms: 300.0,
            step_ms: 150.0,
            class: "visible".to_string(),
        }
    }

    #[test]
    fn test_delays_strictly_increase() {
        let delays = stagger_delays(5, 300.0, 150.0);
        assert_eq!(delays, vec![300.0, 450.0, 600.0, 750.0, 900.0]);
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_push_keeps_order() {
        let mut seq = AnimationSequence::new(NodeId(0));
        for (target, delay) in [(1, 200.0), (2, 100.0), (3, 200.0), (4, 0.0)] {
            seq.push(StaggerStep {
                target: NodeId(target),
                delay_ms: delay,
                change: StyleChange::add_class("visible"),
            });
        }
        let targets: Vec<u32> = seq.steps().iter().map(|s| s.target.0).collect();
        assert_eq!(targets, vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_letter_reveal_splits_text() {
        let mut page = MemoryPage::default();
        let heading = page.add(None, "h2");
        page.seed_text(heading, "Hi there");

        let seq = prepare_letter_reveal(&mut page, heading, 50.0).unwrap();
        let letters = page.query_all(".letter");
        assert_eq!(letters.len(), 8);
        assert_eq!(page.text(heading), "Hi\u{a0}there");
        assert!(letters
            .iter()
            .all(|&l| page.style(l, "opacity").as_deref() == Some("0")));
        assert_eq!(seq.len(), 8);
        assert_eq!(seq.delays()[..3], [0.0, 50.0, 100.0]);
        assert!(page.has_class(heading, "animated"));
    }

    #[test]
    fn test_letter_reveal_guard_prevents_duplicates() {
        let mut page = MemoryPage::default();
        let heading = page.add(None, "h2");
        page.seed_text(heading, "Work");
        prepare_letter_reveal(&mut page, heading, 50.0).unwrap();
        let before = page.mutation_count();

        let err = prepare_letter_reveal(&mut page, heading, 50.0).unwrap_err();
        assert_eq!(
            err,
            FolioError::AlreadyAnimated {
                marker: "animated".to_string()
            }
        );
        assert_eq!(page.mutation_count(), before);
        assert_eq!(page.query_all(".letter").len(), 4);
    }

    #[test]
    fn test_stagger_reveal_with_lead() {
        let mut page = MemoryPage::default();
        let section = page.add(None, "section.services-section");
        let sticker = page.add(Some(section), "img.services-sticker");
        let a = page.add(Some(section), "li.service-item");
        let b = page.add(Some(section), "li.service-item");
        page.add(None, "li.service-item");

        let seq = prepare_stagger_reveal(&mut page, section, &services_rule()).unwrap();
        let plan: Vec<(NodeId, f64)> = seq.steps().iter().map(|s| (s.target, s.delay_ms)).collect();
        assert_eq!(plan, vec![(sticker, 100.0), (a, 300.0), (b, 450.0)]);
        // Nothing is revealed until the animator plays the sequence
        assert!(!page.has_class(a, "visible"));
        assert!(prepare_stagger_reveal(&mut page, section, &services_rule()).is_err());
    }

    #[test]
    fn test_stagger_reveal_without_children() {
        let mut page = MemoryPage::default();
        let section = page.add(None, "section.services-section");
        let err = prepare_stagger_reveal(&mut page, section, &services_rule()).unwrap_err();
        assert!(matches!(err, FolioError::MissingElement { .. }));
        assert!(!page.has_class(section, "animated"));
    }
}
