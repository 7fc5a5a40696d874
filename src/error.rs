//! Library errors.

/// Errors raised by the capture library.
///
/// Most problems met while walking a page never surface here: unknown tags,
/// stray list items and title-less attachment markers degrade gracefully, and
/// per-turn failures become [`crate::segmenter::Diagnostic`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid strip pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Subtree is {depth} levels deep (limit {limit})")]
    ConversionFailure { depth: usize, limit: usize },
}

pub type Result<T, E = CaptureError> = std::result::Result<T, E>;
