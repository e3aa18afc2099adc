use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use crate::actor::ActorCx;
use crate::behaviour::Behaviour;
use crate::event_handler::{ActorEvent, EventResult};
use crate::observable::{Observable, SubscriptionId};

/// `(cx, selected index, whether it is this actor's index)`
pub type SelectHandler = Box<dyn FnMut(&mut ActorCx<'_>, i32, bool)>;

/// Ties an actor to one index of a shared selection [`Observable`].
///
/// Clicking the actor selects it in the scene and writes its index into the
/// observable. Any change of the observable, wherever it comes from, is
/// delivered to `on_select` from the scene's idle pass and repaints the actor.
pub struct Selectable {
    observable: Observable,
    index: i32,
    on_select: Option<SelectHandler>,
    pending: Rc<Cell<Option<i32>>>,
    subscription: Option<SubscriptionId>,
}

impl Selectable {
    pub fn new(observable: Observable, index: i32) -> Self {
        Self {
            observable,
            index,
            on_select: None,
            pending: Rc::new(Cell::new(None)),
            subscription: None,
        }
    }

    pub fn on_select(mut self, f: impl FnMut(&mut ActorCx<'_>, i32, bool) + 'static) -> Self {
        self.on_select = Some(Box::new(f));
        self
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn observable(&self) -> &Observable {
        &self.observable
    }

    pub fn is_selected(&self) -> bool {
        self.observable.get() == self.index
    }
}

impl Behaviour for Selectable {
    fn init(&mut self, cx: &mut ActorCx<'_>) {
        let pending = self.pending.clone();
        let idle = cx.scene.idle_handle();
        let id = cx.id();
        self.subscription = Some(self.observable.subscribe(move |value| {
            pending.set(Some(value));
            idle.queue(id);
        }));
    }

    fn event(&mut self, cx: &mut ActorCx<'_>, event: &ActorEvent) -> EventResult {
        if let ActorEvent::ButtonPress { .. } = event {
            let id = cx.id();
            cx.scene.set_selected(Some(id));
            self.observable.set(self.index);
        }
        EventResult::Ignored
    }

    fn idle(&mut self, cx: &mut ActorCx<'_>) {
        let Some(value) = self.pending.take() else {
            return;
        };
        let is_self = value == self.index;
        if let Some(on_select) = self.on_select.as_mut() {
            on_select(cx, value, is_self);
        }
        cx.invalidate();
    }

    fn free(&mut self, _cx: &mut ActorCx<'_>) {
        if let Some(id) = self.subscription.take() {
            self.observable.unsubscribe(id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
