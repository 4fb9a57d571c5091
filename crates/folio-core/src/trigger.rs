//! One-shot viewport triggers.
//!
//! A trigger pairs an element with a visibility threshold and an `FnOnce`
//! callback. The first intersection report that meets the threshold consumes
//! the callback; later reports for the same trigger are ignored, so re-entry
//! into the viewport can never run it twice. The same element may carry any
//! number of triggers with different thresholds.
//!
//! Intersection data arrives either from the browser (`IntersectionObserver`
//! entries forwarded to [`ViewportTriggers::handle_intersection`]) or from
//! geometry via [`ViewportTriggers::evaluate`].

use tracing::{debug, trace};

use crate::dom::{NodeId, Page};

/// Identifies a registered trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(pub u32);

/// Tolerance when comparing an intersection ratio to its threshold.
/// Browsers report ratios such as 0.49999 for a target that crossed 0.5.
const RATIO_EPSILON: f64 = 1e-6;

/// Persistent part of a trigger. `fired` goes from false to true once and is
/// never reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerState {
    pub element: NodeId,
    pub threshold: f64,
    pub fired: bool,
}

impl TriggerState {
    /// Whether an intersection report meets this trigger's threshold.
    /// A zero threshold is met by any intersection.
    pub fn is_met(&self, ratio: f64, is_intersecting: bool) -> bool {
        if self.threshold <= 0.0 {
            is_intersecting
        } else {
            is_intersecting && ratio + RATIO_EPSILON >= self.threshold
        }
    }
}

/// Callback run when a trigger fires, with the caller's context and the element.
pub type TriggerCallback<C> = Box<dyn FnOnce(&mut C, NodeId)>;

struct Entry<C> {
    id: TriggerId,
    state: TriggerState,
    callback: Option<TriggerCallback<C>>,
}

/// Registry of one-shot triggers.
///
/// `C` is the context handed to callbacks when they fire; it is passed in at
/// dispatch time so callbacks never capture shared mutable state.
pub struct ViewportTriggers<C> {
    entries: Vec<Entry<C>>,
    next_id: u32,
}

impl<C> Default for ViewportTriggers<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl<C> std::fmt::Debug for ViewportTriggers<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportTriggers")
            .field(
                "states",
                &self.entries.iter().map(|e| e.state).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<C> ViewportTriggers<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run the first time `element` meets `threshold`.
    ///
    /// A missing element registers nothing and returns `None`. The threshold
    /// is clamped to `[0, 1]`.
    pub fn observe(
        &mut self,
        element: Option<NodeId>,
        threshold: f64,
        callback: impl FnOnce(&mut C, NodeId) + 'static,
    ) -> Option<TriggerId> {
        let Some(element) = element else {
            debug!(threshold, "viewport trigger skipped: element missing");
            return None;
        };
        let id = TriggerId(self.next_id);
        self.next_id += 1;
        let threshold = if threshold.is_nan() {
            0.0
        } else {
            threshold.clamp(0.0, 1.0)
        };
        self.entries.push(Entry {
            id,
            state: TriggerState {
                element,
                threshold,
                fired: false,
            },
            callback: Some(Box::new(callback)),
        });
        trace!(?id, ?element, threshold, "viewport trigger registered");
        Some(id)
    }

    /// Feed one intersection report. Fires every pending trigger on `node`
    /// whose threshold is met, in registration order, and returns how many fired.
    pub fn handle_intersection(
        &mut self,
        ctx: &mut C,
        node: NodeId,
        ratio: f64,
        is_intersecting: bool,
    ) -> usize {
        let mut fired = 0;
        for entry in self.entries.iter_mut() {
            if entry.state.element != node
                || entry.state.fired
                || !entry.state.is_met(ratio, is_intersecting)
            {
                continue;
            }
            entry.state.fired = true;
            if let Some(callback) = entry.callback.take() {
                debug!(id = ?entry.id, ?node, ratio, "viewport trigger fired");
                callback(ctx, node);
                fired += 1;
            }
        }
        fired
    }

    /// Intersection of every pending node with the viewport, computed from
    /// layout geometry: `(node, visible ratio, intersecting)`.
    pub fn measure(&self, page: &dyn Page) -> Vec<(NodeId, f64, bool)> {
        let viewport = page.viewport();
        self.pending_nodes()
            .into_iter()
            .map(|node| {
                let rect = page.bounding_rect(node);
                (node, rect.visible_fraction(&viewport), rect.touches(&viewport))
            })
            .collect()
    }

    /// [`measure`](Self::measure) and dispatch in one go, for callers whose
    /// page does not live inside the context.
    pub fn evaluate(&mut self, ctx: &mut C, page: &dyn Page) -> usize {
        self.measure(page)
            .into_iter()
            .map(|(node, ratio, intersecting)| {
                self.handle_intersection(ctx, node, ratio, intersecting)
            })
            .sum()
    }

    /// Distinct elements that still have at least one pending trigger.
    pub fn pending_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .entries
            .iter()
            .filter(|e| !e.state.fired)
            .map(|e| e.state.element)
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }

    /// Distinct thresholds that still have pending triggers, ascending.
    pub fn thresholds(&self) -> Vec<f64> {
        let mut thresholds: Vec<f64> = self
            .entries
            .iter()
            .filter(|e| !e.state.fired)
            .map(|e| e.state.threshold)
            .collect();
        thresholds.sort_by(|a, b| a.total_cmp(b));
        thresholds.dedup();
        thresholds
    }

    /// Elements observed at exactly `threshold` with a pending trigger.
    pub fn observed_nodes(&self, threshold: f64) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .entries
            .iter()
            .filter(|e| !e.state.fired && e.state.threshold == threshold)
            .map(|e| e.state.element)
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }

    /// Whether `node` no longer has any pending trigger at `threshold`, so a
    /// native observer may stop watching it.
    pub fn is_detached(&self, node: NodeId, threshold: f64) -> bool {
        !self
            .entries
            .iter()
            .any(|e| e.state.element == node && e.state.threshold == threshold && !e.state.fired)
    }

    pub fn state(&self, id: TriggerId) -> Option<TriggerState> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.state)
    }

    pub fn is_fired(&self, id: TriggerId) -> bool {
        self.state(id).is_some_and(|s| s.fired)
    }

    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|e| !e.state.fired).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
