//! Error types for folio-core.
//!
//! Nothing here is fatal to the page. Callers log the error and carry on.

/// Recoverable rejections raised by components.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FolioError {
    /// An idempotence or reentrancy guard was hit.
    #[error("element already carries the `{marker}` marker")]
    AlreadyAnimated { marker: String },
    /// A required element is absent from the page.
    #[error("no element matches `{selector}`")]
    MissingElement { selector: String },
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

pub type Result<T> = std::result::Result<T, FolioError>;
