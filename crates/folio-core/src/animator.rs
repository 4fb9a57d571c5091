//! Animator: the virtual clock behind every staggered and scramble reveal.
//!
//! There are no free-running timers. Every pending continuation belongs to an
//! animation owned by the `Animator`, and every animation is returned to the
//! caller as an [`AnimationHandle`]. Cancelling the handle drops all of its
//! pending continuations.
//!
//! # Usage
//!
//! ```ignore
//! let mut animator = Animator::new();
//! let seq = prepare_stagger_reveal(&mut page, section, &rule)?;
//! let handle = animator.start_sequence(seq);
//!
//! // Each frame (the browser layer calls this from requestAnimationFrame)
//! animator.update(&mut page, 16.0);
//!
//! // Abort mid-flight
//! handle.cancel();
//! ```
//!
//! Continuations run in due-time order across all animations, so two
//! cascades that interleave in wall-clock time interleave on the page too.
//! A single `update` covering several due times runs all of them.

use std::cell::Cell;
use std::rc::Rc;

use folio_config::ScrambleConfig;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::dom::{NodeId, Page};
use crate::error::{FolioError, Result};
use crate::events::{AnimationEvent, EventQueue};
use crate::reveal::AnimationSequence;
use crate::scramble::ScrambleReveal;
use crate::selectors;

/// Identifier of an animation, unique within one [`Animator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    Sequence,
    Scramble,
}

/// Caller-side handle. Clones share the same cancellation flag.
#[derive(Debug, Clone)]
pub struct AnimationHandle {
    id: AnimationId,
    cancelled: Rc<Cell<bool>>,
}

impl AnimationHandle {
    pub fn id(&self) -> AnimationId {
        self.id
    }

    /// Stop every pending continuation. Takes effect at the next update,
    /// before anything else is written.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

#[derive(Debug)]
enum Task {
    Sequence {
        sequence: AnimationSequence,
        started_at: f64,
        next: usize,
    },
    Scramble {
        node: NodeId,
        reveal: ScrambleReveal,
        due: Option<f64>,
    },
}

#[derive(Debug)]
struct ActiveAnimation {
    id: AnimationId,
    node: NodeId,
    cancelled: Rc<Cell<bool>>,
    task: Task,
}

impl ActiveAnimation {
    fn kind(&self) -> AnimationKind {
        match self.task {
            Task::Sequence { .. } => AnimationKind::Sequence,
            Task::Scramble { .. } => AnimationKind::Scramble,
        }
    }

    /// Absolute time of the next continuation, `None` when finished.
    fn next_due(&self) -> Option<f64> {
        match &self.task {
            Task::Sequence {
                sequence,
                started_at,
                next,
            } => sequence.steps().get(*next).map(|s| started_at + s.delay_ms),
            Task::Scramble { due, .. } => *due,
        }
    }

    fn run_due(&mut self, page: &mut dyn Page, rng: &mut SmallRng, now: f64) {
        match &mut self.task {
            Task::Sequence { sequence, next, .. } => {
                if let Some(step) = sequence.steps().get(*next) {
                    step.change.apply(page, step.target);
                    *next += 1;
                }
            }
            Task::Scramble { node, reveal, due } => {
                let step = reveal.step(rng);
                for frame in &step.frames {
                    trace!(node = ?*node, text = frame.text(), "scramble frame");
                    page.set_text(*node, frame.text());
                }
                *due = step.next_in_ms.map(|delay| now + delay);
            }
        }
    }

    fn event(&self, make: fn(AnimationId, NodeId, AnimationKind) -> AnimationEvent) -> AnimationEvent {
        make(self.id, self.node, self.kind())
    }
}

fn started(animation_id: AnimationId, node_id: NodeId, kind: AnimationKind) -> AnimationEvent {
    AnimationEvent::Started {
        animation_id,
        node_id,
        kind,
    }
}

fn ended(animation_id: AnimationId, node_id: NodeId, kind: AnimationKind) -> AnimationEvent {
    AnimationEvent::Ended {
        animation_id,
        node_id,
        kind,
    }
}

fn cancelled(animation_id: AnimationId, node_id: NodeId, kind: AnimationKind) -> AnimationEvent {
    AnimationEvent::Cancelled {
        animation_id,
        node_id,
        kind,
    }
}

/// Owner of all running reveals.
#[derive(Debug)]
pub struct Animator {
    now_ms: f64,
    next_id: u64,
    animations: Vec<ActiveAnimation>,
    rng: SmallRng,
    events: EventQueue,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    /// Animator with an entropy-seeded generator for flicker characters.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Deterministic flicker characters, for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            now_ms: 0.0,
            next_id: 1,
            animations: Vec::new(),
            rng,
            events: EventQueue::new(),
        }
    }

    /// Virtual time in milliseconds since creation.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    fn register(&mut self, node: NodeId, task: Task) -> AnimationHandle {
        let id = AnimationId(self.next_id);
        self.next_id += 1;
        let flag = Rc::new(Cell::new(false));
        let animation = ActiveAnimation {
            id,
            node,
            cancelled: flag.clone(),
            task,
        };
        self.events.push(animation.event(started));
        debug!(?id, ?node, kind = ?animation.kind(), "animation started");
        self.animations.push(animation);
        AnimationHandle {
            id,
            cancelled: flag,
        }
    }

    /// Play `sequence`, with step delays measured from now.
    pub fn start_sequence(&mut self, sequence: AnimationSequence) -> AnimationHandle {
        let node = sequence.owner();
        self.register(
            node,
            Task::Sequence {
                sequence,
                started_at: self.now_ms,
                next: 0,
            },
        )
    }

    /// Start the scramble effect on `node`.
    ///
    /// The target text is the `data-text` attribute, or the current text when
    /// the attribute is absent. The element receives the `codified` marker;
    /// a second start on the same element fails with
    /// [`FolioError::AlreadyAnimated`] and leaves the running effect alone.
    pub fn start_scramble(
        &mut self,
        page: &mut dyn Page,
        node: NodeId,
        config: &ScrambleConfig,
    ) -> Result<AnimationHandle> {
        if page.has_class(node, selectors::CODIFIED) || self.is_running_on(node, AnimationKind::Scramble) {
            return Err(FolioError::AlreadyAnimated {
                marker: selectors::CODIFIED.to_string(),
            });
        }
        page.add_class(node, selectors::CODIFIED);
        let text = page
            .attribute(node, "data-text")
            .unwrap_or_else(|| page.text(node));
        page.set_text(node, "");

        let mut reveal = ScrambleReveal::from_config(&text, config);
        let first = reveal.step(&mut self.rng);
        let due = first.next_in_ms.map(|delay| self.now_ms + delay);
        Ok(self.register(node, Task::Scramble { node, reveal, due }))
    }

    fn is_running_on(&self, node: NodeId, kind: AnimationKind) -> bool {
        self.animations
            .iter()
            .any(|a| a.node == node && a.kind() == kind && !a.cancelled.get())
    }

    /// Cancel by id. Returns `false` if the animation is not active.
    pub fn cancel(&mut self, id: AnimationId) -> bool {
        match self.animations.iter().find(|a| a.id == id) {
            Some(animation) => {
                animation.cancelled.set(true);
                self.reap_cancelled();
                true
            }
            None => false,
        }
    }

    fn reap_cancelled(&mut self) {
        let events = &mut self.events;
        self.animations.retain(|a| {
            if a.cancelled.get() {
                debug!(id = ?a.id, "animation cancelled");
                events.push(a.event(cancelled));
                false
            } else {
                true
            }
        });
    }

    fn reap_finished(&mut self) {
        let events = &mut self.events;
        self.animations.retain(|a| {
            if a.next_due().is_none() {
                trace!(id = ?a.id, "animation ended");
                events.push(a.event(ended));
                false
            } else {
                true
            }
        });
    }

    /// Advance the clock by `delta_ms` and run every continuation that falls due.
    pub fn update(&mut self, page: &mut dyn Page, delta_ms: f64) {
        let target = self.now_ms + delta_ms.max(0.0);
        loop {
            self.reap_cancelled();
            self.reap_finished();

            let next = self
                .animations
                .iter()
                .enumerate()
                .filter_map(|(i, a)| a.next_due().map(|due| (i, due)))
                .filter(|&(_, due)| due <= target)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            let Some((index, due)) = next else { break };

            self.now_ms = self.now_ms.max(due);
            let now = self.now_ms;
            self.animations[index].run_due(page, &mut self.rng, now);
        }
        self.now_ms = target;
    }

    pub fn is_active(&self, id: AnimationId) -> bool {
        self.animations
            .iter()
            .any(|a| a.id == id && !a.cancelled.get())
    }

    pub fn active_count(&self) -> usize {
        self.animations.iter().filter(|a| !a.cancelled.get()).count()
    }

    pub fn has_active(&self) -> bool {
        self.active_count() > 0
    }

    pub fn drain_events(&mut self) -> Vec<AnimationEvent> {
        self.events.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryPage;
    use crate::reveal::{StaggerStep, StyleChange};

    fn scramble_config() -> ScrambleConfig {
        ScrambleConfig {
            speed_ms: 25.0,
            scramble_speed_ms: 15.0,
            scramble_count: 1,
            charset: "#".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sequence_applies_steps_on_time() {
        let mut page = MemoryPage::default();
        let a = page.add(None, "li");
        let b = page.add(None, "li");
        let mut animator = Animator::with_seed(1);
        let seq = AnimationSequence::staggered(a, &[a, b], 100.0, 150.0, StyleChange::add_class("visible"));
        let handle = animator.start_sequence(seq);

        animator.update(&mut page, 99.0);
        assert!(!page.has_class(a, "visible"));
        animator.update(&mut page, 1.0);
        assert!(page.has_class(a, "visible"));
        assert!(!page.has_class(b, "visible"));
        animator.update(&mut page, 150.0);
        assert!(page.has_class(b, "visible"));
        animator.update(&mut page, 1.0);
        assert!(!animator.is_active(handle.id()));
        assert_eq!(animator.now_ms(), 251.0);

        let events = animator.drain_events();
        assert!(matches!(events[0], AnimationEvent::Started { .. }));
        assert!(matches!(events[1], AnimationEvent::Ended { .. }));
    }

    #[test]
    fn test_cancel_stops_pending_steps() {
        let mut page = MemoryPage::default();
        let items: Vec<NodeId> = (0..4).map(|_| page.add(None, "li")).collect();
        let mut animator = Animator::with_seed(1);
        let handle = animator.start_sequence(AnimationSequence::staggered(
            items[0],
            &items,
            0.0,
            100.0,
            StyleChange::add_class("visible"),
        ));

        animator.update(&mut page, 150.0);
        assert!(page.has_class(items[1], "visible"));
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
        let writes_before = page.style_writes(items[2], "opacity");
        animator.update(&mut page, 1000.0);
        assert!(!page.has_class(items[2], "visible"));
        assert!(!page.has_class(items[3], "visible"));
        assert_eq!(page.style_writes(items[2], "opacity"), writes_before);
        assert_eq!(animator.active_count(), 0);
        assert!(matches!(
            animator.drain_events().last(),
            Some(AnimationEvent::Cancelled { .. })
        ));
    }

    #[test]
    fn test_scramble_hi_frames() {
        let mut page = MemoryPage::default();
        let node = page.add(None, "span.codify-text[data-text=\"HI\"]");
        let mut animator = Animator::with_seed(42);
        animator
            .start_scramble(&mut page, node, &scramble_config())
            .unwrap();

        for _ in 0..10 {
            animator.update(&mut page, 10.0);
        }
        assert_eq!(page.text_history(node), vec!["", "#", "H", "H#", "HI"]);
        assert_eq!(page.text(node), "HI");
        assert!(!animator.has_active());
    }

    #[test]
    fn test_scramble_reentrancy_guard() {
        let mut page = MemoryPage::default();
        let node = page.add(None, "span.codify-text");
        page.seed_text(node, "code");
        let mut animator = Animator::with_seed(3);
        animator
            .start_scramble(&mut page, node, &scramble_config())
            .unwrap();
        animator.update(&mut page, 20.0);

        let err = animator
            .start_scramble(&mut page, node, &scramble_config())
            .unwrap_err();
        assert!(matches!(err, FolioError::AlreadyAnimated { .. }));
        assert_eq!(animator.active_count(), 1);

        animator.update(&mut page, 1000.0);
        assert_eq!(page.text(node), "code");
    }

    #[test]
    fn test_cancel_scramble_mid_flight() {
        let mut page = MemoryPage::default();
        let node = page.add(None, "span[data-text=\"abcdef\"]");
        let mut animator = Animator::with_seed(5);
        let handle = animator
            .start_scramble(&mut page, node, &scramble_config())
            .unwrap();
        animator.update(&mut page, 60.0);
        let partial = page.text(node);
        assert!(animator.cancel(handle.id()));
        assert!(!animator.cancel(handle.id()));
        animator.update(&mut page, 1000.0);
        assert_eq!(page.text(node), partial);
        assert!(partial.chars().count() < 6);
    }

    #[test]
    fn test_interleaved_sequences_run_in_time_order() {
        let mut page = MemoryPage::default();
        let a = page.add(None, "div");
        let b = page.add(None, "div");
        let mut animator = Animator::with_seed(1);

        let mut first = AnimationSequence::new(a);
        first.push(StaggerStep {
            target: a,
            delay_ms: 30.0,
            change: StyleChange::set_style("order", "first"),
        });
        let mut second = AnimationSequence::new(b);
        second.push(StaggerStep {
            target: a,
            delay_ms: 10.0,
            change: StyleChange::set_style("order", "second"),
        });
        animator.start_sequence(first);
        animator.start_sequence(second);

        animator.update(&mut page, 100.0);
        // The 30ms step of the first sequence lands after the 10ms step of the second
        assert_eq!(page.style(a, "order").as_deref(), Some("first"));
        assert_eq!(page.style_writes(a, "order"), 2);
    }
}
