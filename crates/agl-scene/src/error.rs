//! Error types for scene operations.

use agl_core::RenderError;
use thiserror::Error;

use crate::actor::ActorId;

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors raised by the scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The render context failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The actor handle does not refer to a live actor.
    #[error("actor {0:?} has been freed")]
    StaleActor(ActorId),
}
