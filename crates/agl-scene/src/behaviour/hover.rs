use std::any::Any;

use crate::actor::ActorCx;
use crate::behaviour::Behaviour;
use crate::event_handler::{ActorEvent, EventResult};

/// Repaints the actor when the pointer enters or leaves it.
///
/// Never consumes the event.
#[derive(Debug, Default)]
pub struct Hover {
    hovered: bool,
}

impl Hover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }
}

impl Behaviour for Hover {
    fn event(&mut self, cx: &mut ActorCx<'_>, event: &ActorEvent) -> EventResult {
        match event {
            ActorEvent::Enter => {
                self.hovered = true;
                cx.invalidate();
            }
            ActorEvent::Leave => {
                self.hovered = false;
                cx.invalidate();
            }
            _ => {}
        }
        EventResult::Ignored
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
