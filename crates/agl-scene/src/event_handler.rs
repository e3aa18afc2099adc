//! Input event types delivered to actors and behaviours.
//!
//! The scene receives [`InputEvent`]s in window coordinates and hands each
//! actor an [`ActorEvent`] whose positions are relative to that actor's
//! region origin.
use winit::event::MouseButton;
use winit::keyboard::{KeyCode, ModifiersState};

/// Result of an event handling operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was handled and should not propagate
    Handled,
    /// Event was not handled, continue propagation
    Ignored,
}

impl EventResult {
    pub fn is_handled(&self) -> bool {
        matches!(self, EventResult::Handled)
    }
}

/// Event as received from the window, in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMove {
        x: f32,
        y: f32,
        modifiers: ModifiersState,
    },
    ButtonPress {
        x: f32,
        y: f32,
        button: MouseButton,
        modifiers: ModifiersState,
    },
    ButtonRelease {
        x: f32,
        y: f32,
        button: MouseButton,
        modifiers: ModifiersState,
    },
    Scroll {
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
        modifiers: ModifiersState,
    },
    KeyPress {
        key: KeyCode,
        modifiers: ModifiersState,
    },
    KeyRelease {
        key: KeyCode,
        modifiers: ModifiersState,
    },
}

impl InputEvent {
    pub fn motion(x: f32, y: f32) -> Self {
        Self::PointerMove { x, y, modifiers: ModifiersState::empty() }
    }

    pub fn press(x: f32, y: f32) -> Self {
        Self::ButtonPress { x, y, button: MouseButton::Left, modifiers: ModifiersState::empty() }
    }

    pub fn release(x: f32, y: f32) -> Self {
        Self::ButtonRelease { x, y, button: MouseButton::Left, modifiers: ModifiersState::empty() }
    }

    pub fn key(key: KeyCode, modifiers: ModifiersState) -> Self {
        Self::KeyPress { key, modifiers }
    }

    /// Window position of pointer events, `None` for key events.
    pub fn position(&self) -> Option<[f32; 2]> {
        match *self {
            Self::PointerMove { x, y, .. }
            | Self::ButtonPress { x, y, .. }
            | Self::ButtonRelease { x, y, .. }
            | Self::Scroll { x, y, .. } => Some([x, y]),
            Self::KeyPress { .. } | Self::KeyRelease { .. } => None,
        }
    }

    pub fn modifiers(&self) -> ModifiersState {
        match *self {
            Self::PointerMove { modifiers, .. }
            | Self::ButtonPress { modifiers, .. }
            | Self::ButtonRelease { modifiers, .. }
            | Self::Scroll { modifiers, .. }
            | Self::KeyPress { modifiers, .. }
            | Self::KeyRelease { modifiers, .. } => modifiers,
        }
    }
}

/// Event as seen by one actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActorEvent {
    /// The pointer moved onto the actor.
    Enter,
    /// The pointer left the actor.
    Leave,
    Motion {
        x: f32,
        y: f32,
        modifiers: ModifiersState,
    },
    ButtonPress {
        x: f32,
        y: f32,
        button: MouseButton,
        modifiers: ModifiersState,
    },
    ButtonRelease {
        x: f32,
        y: f32,
        button: MouseButton,
        modifiers: ModifiersState,
    },
    Scroll {
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
        modifiers: ModifiersState,
    },
    KeyPress {
        key: KeyCode,
        modifiers: ModifiersState,
    },
    KeyRelease {
        key: KeyCode,
        modifiers: ModifiersState,
    },
}

impl ActorEvent {
    /// Translate a window event into actor-local coordinates. `offset` is
    /// the actor's absolute position.
    pub fn from_input(event: &InputEvent, offset: [f32; 2]) -> Self {
        match *event {
            InputEvent::PointerMove { x, y, modifiers } => Self::Motion {
                x: x - offset[0],
                y: y - offset[1],
                modifiers,
            },
            InputEvent::ButtonPress { x, y, button, modifiers } => Self::ButtonPress {
                x: x - offset[0],
                y: y - offset[1],
                button,
                modifiers,
            },
            InputEvent::ButtonRelease { x, y, button, modifiers } => Self::ButtonRelease {
                x: x - offset[0],
                y: y - offset[1],
                button,
                modifiers,
            },
            InputEvent::Scroll { x, y, dx, dy, modifiers } => Self::Scroll {
                x: x - offset[0],
                y: y - offset[1],
                dx,
                dy,
                modifiers,
            },
            InputEvent::KeyPress { key, modifiers } => Self::KeyPress { key, modifiers },
            InputEvent::KeyRelease { key, modifiers } => Self::KeyRelease { key, modifiers },
        }
    }

    /// Actor-local position of pointer events.
    pub fn position(&self) -> Option<[f32; 2]> {
        match *self {
            Self::Motion { x, y, .. }
            | Self::ButtonPress { x, y, .. }
            | Self::ButtonRelease { x, y, .. }
            | Self::Scroll { x, y, .. } => Some([x, y]),
            _ => None,
        }
    }
}

/// Outcome of [`Scene::dispatch`](crate::Scene::dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    /// Actor the event was aimed at: the grab, the hit-test result or the
    /// key focus.
    pub target: crate::ActorId,
    /// First actor on the path to the root that handled it.
    pub handled_by: Option<crate::ActorId>,
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        self.handled_by.is_some()
    }
}
