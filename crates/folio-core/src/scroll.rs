//! Scroll-position-derived styling.
//!
//! Every scroll tick goes through three steps:
//! 1. [`ScrollStyler::capture`] reads geometry into a [`ScrollFrame`]
//! 2. [`ScrollStyler::compute`] derives [`ScrollEffects`] (pure)
//! 3. [`ScrollStyler::apply`] writes classes and transforms
//!
//! Nothing is queued, so the handler is safe to run on every scroll event.

use folio_config::ScrollConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::{NodeId, Page};
use crate::geometry::Rect;
use crate::selectors;

/// Snapshot of the geometry relevant to one scroll tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrollFrame {
    pub scroll_y: f64,
    pub viewport: Rect,
    pub navbar: Option<Rect>,
    pub landmarks: Vec<Rect>,
    pub video_container: Option<Rect>,
}

/// Styling derived from a [`ScrollFrame`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollEffects {
    pub navbar_visible: bool,
    pub navbar_inverted: bool,
    /// Rotation in degrees per icon, in configuration order.
    pub rotations: Vec<(NodeId, f64)>,
    /// `None` when the page has no video container.
    pub video_in_view: Option<bool>,
}

/// `scrollY * factor` degrees, without wraparound.
pub fn rotation_degrees(scroll_y: f64, factor: f64) -> f64 {
    scroll_y * factor
}

pub fn navbar_visible(scroll_y: f64, threshold: f64) -> bool {
    scroll_y > threshold
}

/// True if the navbar overlaps ANY of the sections.
pub fn overlaps_any(navbar: &Rect, sections: &[Rect]) -> bool {
    sections.iter().any(|s| navbar.overlaps_vertically(s))
}

/// Any intersection with the viewport counts; no threshold.
pub fn in_viewport(rect: &Rect, viewport: &Rect) -> bool {
    !(rect.bottom() < viewport.top || rect.top > viewport.bottom())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rotation {
    node: NodeId,
    factor: f64,
}

/// Navbar visibility and inversion, rotating icons, and video container visibility.
#[derive(Debug, Clone)]
pub struct ScrollStyler {
    threshold: f64,
    navbar: Option<NodeId>,
    video_container: Option<NodeId>,
    landmarks: Vec<NodeId>,
    rotations: Vec<Rotation>,
}

impl ScrollStyler {
    /// Resolve every configured element. Missing ones disable their rule.
    pub fn attach(page: &mut dyn Page, config: &ScrollConfig) -> Self {
        let navbar = page.query(selectors::NAVBAR);
        let video_container = page.query(selectors::VIDEO_CONTAINER);
        let landmarks: Vec<NodeId> = config
            .landmarks
            .iter()
            .filter_map(|s| page.query(s))
            .collect();
        let rotations: Vec<Rotation> = config
            .rotations
            .iter()
            .flat_map(|rule| {
                page.query_all(&rule.selector)
                    .into_iter()
                    .map(move |node| Rotation {
                        node,
                        factor: rule.factor,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        debug!(
            navbar = navbar.is_some(),
            video_container = video_container.is_some(),
            landmarks = landmarks.len(),
            rotations = rotations.len(),
            "scroll styler attached"
        );
        Self {
            threshold: config.navbar_threshold_px,
            navbar,
            video_container,
            landmarks,
            rotations,
        }
    }

    pub fn capture(&self, page: &dyn Page) -> ScrollFrame {
        ScrollFrame {
            scroll_y: page.scroll_y(),
            viewport: page.viewport(),
            navbar: self.navbar.map(|n| page.bounding_rect(n)),
            landmarks: self
                .landmarks
                .iter()
                .map(|&n| page.bounding_rect(n))
                .collect(),
            video_container: self.video_container.map(|n| page.bounding_rect(n)),
        }
    }

    pub fn compute(&self, frame: &ScrollFrame) -> ScrollEffects {
        ScrollEffects {
            navbar_visible: navbar_visible(frame.scroll_y, self.threshold),
            navbar_inverted: frame
                .navbar
                .is_some_and(|nav| overlaps_any(&nav, &frame.landmarks)),
            rotations: self
                .rotations
                .iter()
                .map(|r| (r.node, rotation_degrees(frame.scroll_y, r.factor)))
                .collect(),
            video_in_view: frame
                .video_container
                .map(|rect| in_viewport(&rect, &frame.viewport)),
        }
    }

    pub fn apply(&self, page: &mut dyn Page, effects: &ScrollEffects) {
        if let Some(navbar) = self.navbar {
            page.set_class(navbar, selectors::VISIBLE, effects.navbar_visible);
            page.set_class(navbar, selectors::INVERTED, effects.navbar_inverted);
        }
        if let Some(container) = self.video_container {
            page.set_class(container, selectors::SCROLLED, effects.navbar_visible);
        }
        for &(node, degrees) in &effects.rotations {
            page.set_style(node, "transform", &format!("rotate({degrees}deg)"));
        }
    }

    /// Capture, compute and apply in one go.
    pub fn on_scroll(&self, page: &mut dyn Page) -> ScrollEffects {
        let frame = self.capture(page);
        let effects = self.compute(&frame);
        self.apply(page, &effects);
        effects
    }

    pub fn navbar(&self) -> Option<NodeId> {
        self.navbar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryPage;
    use folio_config::RotationRule;

    fn fixture() -> (MemoryPage, NodeId, NodeId, NodeId) {
        let mut page = MemoryPage::new(1000.0, 800.0);
        let navbar = page.add(None, "nav.navbar");
        page.set_fixed(navbar, true);
        page.set_rect(navbar, Rect::new(0.0, 0.0, 1000.0, 60.0));
        let container = page.add(None, "div.video-container");
        page.set_rect(container, Rect::new(0.0, 0.0, 1000.0, 800.0));
        let services = page.add(None, "section.services-section");
        page.set_rect(services, Rect::new(0.0, 1200.0, 1000.0, 600.0));
        let contact = page.add(None, "section.contact-section");
        page.set_rect(contact, Rect::new(0.0, 3000.0, 1000.0, 600.0));
        let icon = page.add(None, "img.rotating-icon");
        (page, navbar, container, icon)
    }

    #[test]
    fn test_rotation_has_no_wraparound() {
        assert_eq!(rotation_degrees(900.0, 1.0 / 3.0), 300.0);
        assert_eq!(rotation_degrees(900.0, 1.5), 1350.0);
    }

    #[test]
    fn test_navbar_visibility_threshold() {
        let (mut page, navbar, container, _) = fixture();
        let styler = ScrollStyler::attach(&mut page, &ScrollConfig::default());
        assert_eq!(styler.navbar(), Some(navbar));

        for (y, expected) in [(0.0, false), (50.0, false), (51.0, true), (51.0, true), (10.0, false)] {
            page.set_scroll_y(y);
            styler.on_scroll(&mut page);
            assert_eq!(page.has_class(navbar, "visible"), expected, "scrollY = {y}");
            assert_eq!(page.has_class(container, "scrolled"), expected);
        }
    }

    #[test]
    fn test_inversion_is_union_of_landmarks() {
        let (mut page, navbar, _, _) = fixture();
        let styler = ScrollStyler::attach(&mut page, &ScrollConfig::default());

        page.set_scroll_y(1190.0);
        let effects = styler.on_scroll(&mut page);
        assert!(effects.navbar_inverted);
        assert!(page.has_class(navbar, "inverted"));

        page.set_scroll_y(2000.0);
        assert!(!styler.on_scroll(&mut page).navbar_inverted);
        assert!(!page.has_class(navbar, "inverted"));

        page.set_scroll_y(3100.0);
        assert!(styler.on_scroll(&mut page).navbar_inverted);
    }

    #[test]
    fn test_rotations_write_transform() {
        let (mut page, _, _, icon) = fixture();
        let config = ScrollConfig {
            rotations: vec![RotationRule {
                selector: ".rotating-icon".to_string(),
                factor: 1.5,
            }],
            ..Default::default()
        };
        let styler = ScrollStyler::attach(&mut page, &config);
        page.set_scroll_y(100.0);
        styler.on_scroll(&mut page);
        assert_eq!(page.style(icon, "transform").as_deref(), Some("rotate(150deg)"));
    }

    #[test]
    fn test_video_visibility_without_threshold() {
        let (mut page, _, _, _) = fixture();
        let styler = ScrollStyler::attach(&mut page, &ScrollConfig::default());

        page.set_scroll_y(799.0);
        assert_eq!(styler.on_scroll(&mut page).video_in_view, Some(true));
        page.set_scroll_y(800.0);
        assert_eq!(styler.on_scroll(&mut page).video_in_view, Some(true));
        page.set_scroll_y(801.0);
        assert_eq!(styler.on_scroll(&mut page).video_in_view, Some(false));
    }

    #[test]
    fn test_missing_elements_are_noops() {
        let mut page = MemoryPage::default();
        let styler = ScrollStyler::attach(&mut page, &ScrollConfig::default());
        assert_eq!(styler.navbar(), None);
        page.set_scroll_y(500.0);
        let effects = styler.on_scroll(&mut page);
        assert!(effects.navbar_visible);
        assert!(!effects.navbar_inverted);
        assert_eq!(effects.video_in_view, None);
        assert_eq!(page.mutation_count(), 0);
    }
}
