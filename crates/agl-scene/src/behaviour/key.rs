use std::any::Any;
use std::collections::HashMap;

use winit::keyboard::{KeyCode, ModifiersState};

use crate::actor::ActorCx;
use crate::behaviour::Behaviour;
use crate::event_handler::{ActorEvent, EventResult};

/// Most bindings one [`Key`] behaviour accepts.
pub const MAX_KEY_BINDINGS: usize = 100;

pub type KeyHandler = Box<dyn FnMut(&mut ActorCx<'_>, KeyCode, ModifiersState)>;

/// A key code with its press and release handlers.
pub struct KeyBinding {
    pub key: KeyCode,
    /// Required modifiers; `None` accepts any.
    pub modifiers: Option<ModifiersState>,
    pub press: Option<KeyHandler>,
    pub release: Option<KeyHandler>,
}

impl KeyBinding {
    pub fn new(key: KeyCode, press: impl FnMut(&mut ActorCx<'_>, KeyCode, ModifiersState) + 'static) -> Self {
        Self {
            key,
            modifiers: None,
            press: Some(Box::new(press)),
            release: None,
        }
    }

    pub fn with_modifiers(mut self, modifiers: ModifiersState) -> Self {
        self.modifiers = Some(modifiers);
        self
    }

    pub fn on_release(
        mut self,
        release: impl FnMut(&mut ActorCx<'_>, KeyCode, ModifiersState) + 'static,
    ) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    fn accepts(&self, modifiers: ModifiersState) -> bool {
        self.modifiers.is_none_or(|m| m == modifiers)
    }
}

/// Routes key presses to per-key handlers.
///
/// The lookup table is built on first use. Only events with a matching
/// binding are consumed.
pub struct Key {
    pending: Vec<KeyBinding>,
    bindings: Vec<KeyBinding>,
    by_key: HashMap<KeyCode, Vec<usize>>,
}

impl Key {
    pub fn new(bindings: impl IntoIterator<Item = KeyBinding>) -> Self {
        Self {
            pending: bindings.into_iter().collect(),
            bindings: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Number of bindings in the table.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn dispatch(
        &mut self,
        cx: &mut ActorCx<'_>,
        key: KeyCode,
        modifiers: ModifiersState,
        press: bool,
    ) -> EventResult {
        let Some(candidates) = self.by_key.get(&key) else {
            return EventResult::Ignored;
        };
        for &i in candidates {
            let binding = &mut self.bindings[i];
            if !binding.accepts(modifiers) {
                continue;
            }
            let handler = if press { binding.press.as_mut() } else { binding.release.as_mut() };
            if let Some(handler) = handler {
                handler(cx, key, modifiers);
                return EventResult::Handled;
            }
        }
        EventResult::Ignored
    }
}

impl Behaviour for Key {
    fn init(&mut self, _cx: &mut ActorCx<'_>) {
        let pending = std::mem::take(&mut self.pending);
        if pending.len() > MAX_KEY_BINDINGS {
            log::warn!(
                "{} key bindings given, only the first {MAX_KEY_BINDINGS} are used",
                pending.len()
            );
        }
        for binding in pending.into_iter().take(MAX_KEY_BINDINGS) {
            self.by_key.entry(binding.key).or_default().push(self.bindings.len());
            self.bindings.push(binding);
        }
    }

    fn event(&mut self, cx: &mut ActorCx<'_>, event: &ActorEvent) -> EventResult {
        match *event {
            ActorEvent::KeyPress { key, modifiers } => self.dispatch(cx, key, modifiers, true),
            ActorEvent::KeyRelease { key, modifiers } => self.dispatch(cx, key, modifiers, false),
            _ => EventResult::Ignored,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
