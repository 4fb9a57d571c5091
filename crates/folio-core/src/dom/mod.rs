//! DOM abstraction shared by every component.
//!
//! Components never hold browser objects. They address elements through
//! opaque [`NodeId`]s handed out by a [`Page`], and every lookup returns an
//! `Option` so that a missing element degrades to a no-op instead of a panic.
//!
//! - [`Page`]: element lookup, class list, inline style, text, geometry
//! - [`MediaBackend`]: video playback and the audio analyser graph
//! - [`MemoryPage`]: in-memory implementation of both, used by tests and
//!   headless simulation

pub mod memory;
pub mod selector;

pub use memory::{MediaEvent, MemoryPage};
pub use selector::{Compound, Selector};

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Opaque handle to an element owned by a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Read/write access to the document.
///
/// Queries take `&mut self` because implementations may intern the elements
/// they hand out.
pub trait Page {
    /// First element matching `selector`, in document order.
    fn query(&mut self, selector: &str) -> Option<NodeId>;

    /// Every element matching `selector`, in document order.
    fn query_all(&mut self, selector: &str) -> Vec<NodeId>;

    /// Descendants of `root` matching `selector`, in document order.
    fn query_within(&mut self, root: NodeId, selector: &str) -> Vec<NodeId>;

    /// Nearest inclusive ancestor of `node` matching `selector`.
    fn closest(&mut self, node: NodeId, selector: &str) -> Option<NodeId>;

    /// Bounding box in viewport coordinates.
    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// The viewport, always anchored at the origin.
    fn viewport(&self) -> Rect;

    fn scroll_y(&self) -> f64;

    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);

    /// Flip `class` and return whether it is now present.
    fn toggle_class(&mut self, node: NodeId, class: &str) -> bool {
        let on = !self.has_class(node, class);
        self.set_class(node, class, on);
        on
    }

    fn set_class(&mut self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    /// Inline style property, if set.
    fn style(&self, node: NodeId, property: &str) -> Option<String>;
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);

    /// `textContent`, including descendants.
    fn text(&self, node: NodeId) -> String;

    /// Replace `textContent`; existing children are dropped.
    fn set_text(&mut self, node: NodeId, text: &str);

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Create `<tag class="...">` as the last child of `parent`.
    fn append_element(&mut self, parent: NodeId, tag: &str, class: &str) -> NodeId;

    /// Detach `node` from the document. Its id stays valid but inert.
    fn remove(&mut self, node: NodeId);

    /// Smooth-scroll `node` to the top of the viewport.
    fn scroll_into_view(&mut self, node: NodeId);

    fn focus(&mut self, node: NodeId);

    /// Current value of a form control or `<option>`, empty for anything
    /// else.
    fn value(&self, node: NodeId) -> String;

    /// Replace the current location.
    fn navigate(&mut self, url: &str);

    /// Blocking user notification.
    fn alert(&mut self, message: &str);
}

/// Playback and audio analysis for media elements.
///
/// `play` only issues the request; browsers report the start of playback
/// and autoplay rejection asynchronously, and the embedder forwards those to
/// the `Site`.
pub trait MediaBackend {
    fn is_paused(&self, media: NodeId) -> bool;
    fn has_ended(&self, media: NodeId) -> bool;
    fn is_muted(&self, media: NodeId) -> bool;
    fn set_muted(&mut self, media: NodeId, muted: bool);
    fn play(&mut self, media: NodeId);
    fn pause(&mut self, media: NodeId);

    /// Route `media` through a frequency analyser. Idempotent.
    ///
    /// Returns the number of frequency bins, or `None` when no audio graph
    /// can be built.
    fn connect_analyser(&mut self, media: NodeId, fft_size: u32) -> Option<usize>;

    /// Resume the audio context if the browser suspended it.
    fn resume_audio(&mut self);

    /// Fill `out` with byte frequency magnitudes. Returns `false` when no
    /// analyser is connected.
    fn sample_frequencies(&mut self, media: NodeId, out: &mut [u8]) -> bool;
}
