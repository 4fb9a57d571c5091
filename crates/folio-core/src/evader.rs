//! Buttons that slide away from the pointer.

use folio_config::EvaderConfig;
use tracing::debug;

use crate::dom::{NodeId, Page};
use crate::geometry::{Point, Rect};

const RESET_TRANSFORM: &str = "translate(0, 0)";

/// Displacement of a button centered at `center` for a pointer at `pointer`.
///
/// Zero at or beyond `trigger_distance`. Closer in, the button moves
/// directly away with magnitude `max_move * (1 - d / trigger_distance)`;
/// a pointer exactly on the center pushes along negative x.
pub fn evade_offset(center: Point, pointer: Point, max_move: f64, trigger_distance: f64) -> (f64, f64) {
    let dx = pointer.x - center.x;
    let dy = pointer.y - center.y;
    let distance = dx.hypot(dy);
    if distance >= trigger_distance {
        return (0.0, 0.0);
    }
    let magnitude = max_move * (1.0 - distance / trigger_distance);
    if distance == 0.0 {
        return (-magnitude, 0.0);
    }
    (-dx / distance * magnitude, -dy / distance * magnitude)
}

/// Limit `offset` to half the container size on each axis.
pub fn clamp_to_container(offset: (f64, f64), container: &Rect) -> (f64, f64) {
    let half_w = container.width / 2.0;
    let half_h = container.height / 2.0;
    (offset.0.clamp(-half_w, half_w), offset.1.clamp(-half_h, half_h))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EvasiveButton {
    node: NodeId,
    container: Option<NodeId>,
    offset: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct PointerEvader {
    buttons: Vec<EvasiveButton>,
    max_move: f64,
    trigger_distance: f64,
    min_delta: f64,
}

impl PointerEvader {
    /// Collects every matching button except ones hidden with
    /// `visibility: hidden`.
    pub fn attach(page: &mut dyn Page, config: &EvaderConfig) -> Self {
        let candidates = page.query_all(&config.selector);
        let mut buttons = Vec::with_capacity(candidates.len());
        for node in candidates {
            if page.style(node, "visibility").as_deref() == Some("hidden") {
                continue;
            }
            let container = page.closest(node, &config.container);
            buttons.push(EvasiveButton {
                node,
                container,
                offset: (0.0, 0.0),
            });
        }
        debug!(buttons = buttons.len(), "pointer evader attached");
        Self {
            buttons,
            max_move: config.max_move,
            trigger_distance: config.trigger_distance,
            min_delta: config.min_delta,
        }
    }

    pub fn buttons(&self) -> Vec<NodeId> {
        self.buttons.iter().map(|b| b.node).collect()
    }

    /// Last offset written to `button`.
    pub fn offset(&self, button: NodeId) -> Option<(f64, f64)> {
        self.buttons
            .iter()
            .find(|b| b.node == button)
            .map(|b| b.offset)
    }

    /// Reposition every button for a pointer at `pointer` (viewport
    /// coordinates). Returns the number of style writes.
    pub fn on_pointer_move(&mut self, page: &mut dyn Page, pointer: Point) -> usize {
        let mut writes = 0;
        for button in &mut self.buttons {
            // The measured box already carries the last offset
            let measured = page.bounding_rect(button.node).center();
            let home = Point::new(measured.x - button.offset.0, measured.y - button.offset.1);
            let raw = evade_offset(home, pointer, self.max_move, self.trigger_distance);
            let target = match button.container {
                Some(container) => clamp_to_container(raw, &page.bounding_rect(container)),
                None => raw,
            };
            if write_offset(page, button, target, self.min_delta) {
                writes += 1;
            }
        }
        writes
    }

    /// The pointer left `button`: snap it home.
    pub fn on_pointer_leave(&mut self, page: &mut dyn Page, button: NodeId) {
        if let Some(b) = self.buttons.iter_mut().find(|b| b.node == button) {
            b.offset = (0.0, 0.0);
            page.set_style(b.node, "transform", RESET_TRANSFORM);
        }
    }
}

/// Returns whether a write happened. Moves smaller than `min_delta` on both
/// axes are dropped, except the return to the origin.
fn write_offset(page: &mut dyn Page, button: &mut EvasiveButton, target: (f64, f64), min_delta: f64) -> bool {
    let (x, y) = button.offset;
    if target == (0.0, 0.0) {
        if (x, y) == (0.0, 0.0) {
            return false;
        }
        button.offset = target;
        page.set_style(button.node, "transform", RESET_TRANSFORM);
        return true;
    }
    if (target.0 - x).abs() < min_delta && (target.1 - y).abs() < min_delta {
        return false;
    }
    button.offset = target;
    page.set_style(
        button.node,
        "transform",
        &format!("translate({}px, {}px)", target.0, target.1),
    );
    true
}
