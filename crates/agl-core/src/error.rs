//! Error types for rendering collaborators.

use thiserror::Error;

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors raised by render contexts and target allocators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// An off-screen target could not be created.
    #[error("failed to allocate {width}x{height} render target: {reason}")]
    TargetAllocation {
        width: u32,
        height: u32,
        reason: String,
    },

    /// The windowing context could not be made current.
    #[error("render context unavailable: {0}")]
    ContextUnavailable(String),

    /// A target handle did not belong to this allocator.
    #[error("unknown render target {0}")]
    UnknownTarget(u64),

    /// Presenting a frame failed.
    #[error("present failed: {0}")]
    Present(String),
}
