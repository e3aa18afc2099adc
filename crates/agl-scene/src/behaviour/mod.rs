//! Capabilities attached to actors.
//!
//! Behaviours compose features onto an actor without changing its delegate.
//! They are kept in attachment order, which is also their event priority:
//! the first behaviour to handle an event stops it from reaching later
//! behaviours and the actor's own `on_event`.
//!
//! `init` is deferred until the behaviour is first used, since a behaviour
//! is usually built before the actor it ends up on exists.

use std::any::Any;

use agl_core::Painter;

use crate::actor::ActorCx;
use crate::event_handler::{ActorEvent, EventResult};

pub mod follow;
pub mod hover;
pub mod invalidator;
pub mod key;
pub mod selectable;

pub use follow::Follow;
pub use hover::Hover;
pub use invalidator::{Invalidator, Resolver};
pub use key::{Key, KeyBinding, KeyHandler, MAX_KEY_BINDINGS};
pub use selectable::{Selectable, SelectHandler};

pub trait Behaviour: Any {
    /// First use on an actor.
    fn init(&mut self, cx: &mut ActorCx<'_>) {
        let _ = cx;
    }

    /// Runs on resize and once per frame before painting.
    fn layout(&mut self, cx: &mut ActorCx<'_>) {
        let _ = cx;
    }

    /// Runs before the actor's `paint`. Returning `false` skips it.
    fn draw(&mut self, cx: &mut ActorCx<'_>, painter: &mut Painter) -> bool {
        let _ = (cx, painter);
        true
    }

    fn event(&mut self, cx: &mut ActorCx<'_>, event: &ActorEvent) -> EventResult {
        let _ = (cx, event);
        EventResult::Ignored
    }

    /// Deferred work queued with [`Scene::queue_idle`](crate::Scene::queue_idle).
    fn idle(&mut self, cx: &mut ActorCx<'_>) {
        let _ = cx;
    }

    fn free(&mut self, cx: &mut ActorCx<'_>) {
        let _ = cx;
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A behaviour in an actor's list. The box is taken out while one of its
/// hooks runs.
pub(crate) struct BehaviourSlot {
    pub(crate) behaviour: Option<Box<dyn Behaviour>>,
    pub(crate) initialised: bool,
}

impl BehaviourSlot {
    pub(crate) fn new(behaviour: Box<dyn Behaviour>) -> Self {
        Self { behaviour: Some(behaviour), initialised: false }
    }
}
