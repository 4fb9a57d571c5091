//! folio-core: interaction layer of the portfolio page.
//!
//! Everything here is platform independent. Components reach the document
//! through the [`dom::Page`] and [`dom::MediaBackend`] traits, so the whole
//! layer runs against [`dom::MemoryPage`] in tests and against the browser
//! DOM in `folio-web`.
//!
//! # Components
//!
//! - [`trigger::ViewportTriggers`]: one-shot "element entered the viewport" callbacks
//! - [`scroll::ScrollStyler`]: navbar state, icon rotation, video visibility
//! - [`reveal`] and [`scramble`]: staggered and scramble reveals, played by
//!   the [`animator::Animator`]
//! - [`media::MediaController`]: video playback and the audio visualizer
//! - [`evader::PointerEvader`]: buttons that avoid the pointer
//! - [`nav`] and [`contact`]: navigation and contact form affordances
//! - [`site::Site`]: all of the above, wired to one page

pub mod animator;
pub mod contact;
pub mod dom;
pub mod error;
pub mod evader;
pub mod events;
pub mod geometry;
pub mod media;
pub mod nav;
pub mod reveal;
pub mod scramble;
pub mod scroll;
pub mod selectors;
pub mod site;
pub mod trigger;

pub use animator::{AnimationHandle, AnimationId, AnimationKind, Animator};
pub use contact::{ContactForm, SubmitOutcome, SubmitRequest};
pub use dom::{MediaBackend, MediaEvent, MemoryPage, NodeId, Page};
pub use error::{FolioError, Result};
pub use events::AnimationEvent;
pub use geometry::{Point, Rect};
pub use site::{ClickOutcome, Site, Stage};
pub use trigger::{TriggerId, ViewportTriggers};

pub use folio_config::FolioConfig;
