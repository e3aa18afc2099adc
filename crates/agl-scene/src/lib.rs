//! agl-scene: retained actor scenegraph with per-actor render caches.
//!
//! A [`Scene`] holds a tree of actors. Each actor draws through its
//! [`ActorDelegate`] and may carry [`Behaviour`]s that add hover tracking,
//! selection, key bindings and similar features. Actors can cache their
//! subtree in an off-screen target so that unchanged parts of the tree are
//! blitted instead of re-rendered. Property changes are animated by the
//! scene's [`AnimationRunner`].

pub mod actor;
pub mod animation;
pub mod behaviour;
pub mod error;
pub mod event_handler;
mod event_router;
pub mod observable;
pub mod scene;

pub use actor::{
    Actor, ActorCx, ActorDelegate, ActorId, ActorNode, Fill, FnDelegate, Group, Lifecycle,
    RenderCache,
};
pub use animation::{
    Animatable, AnimationId, AnimationRunner, EasingFunction, FrameClock, ManualClock, Scalar,
    ScalarKind, StepPosition, SystemClock, TickReport,
};
pub use behaviour::Behaviour;
pub use error::{Result, SceneError};
pub use event_handler::{ActorEvent, Dispatch, EventResult, InputEvent};
pub use observable::{Observable, SubscriptionId};
pub use scene::{IdleHandle, Scene};
