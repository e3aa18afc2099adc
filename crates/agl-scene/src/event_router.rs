//! Input routing for [`Scene`].
//!
//! While a grab is active every event goes to the grabbing actor. Otherwise
//! pointer events go to the topmost enabled actor under the pointer and key
//! events go to the selected actor, else the hovered one, else the root.
//! Either way the event bubbles
//! from the target towards the root until an actor handles it; each actor
//! gets it in its own coordinates, behaviours first, then its `on_event`.

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::PhysicalKey;

use crate::actor::ActorId;
use crate::event_handler::{ActorEvent, Dispatch, EventResult, InputEvent};
use crate::scene::Scene;

/// Pixels per wheel notch.
const LINE_SCROLL: f32 = 20.0;

impl Scene {
    /// Route an input event. Hover changes are delivered first as
    /// [`ActorEvent::Leave`] and [`ActorEvent::Enter`], which do not bubble.
    pub fn dispatch(&mut self, event: &InputEvent) -> Dispatch {
        if let Some(pos) = event.position() {
            self.pointer = Some(pos);
        }
        let grab = self.grabbed.filter(|g| self.contains(*g));
        let target = match (grab, event.position()) {
            (Some(grab), _) => grab,
            (None, None) => self.key_target(),
            (None, Some(pos)) => {
                let hit = self.hit_test(pos);
                self.update_hover(hit);
                hit.unwrap_or(self.root)
            }
        };
        let handled_by = self.bubble(target, event);
        log::trace!("{event:?} -> {target:?}, handled by {handled_by:?}");
        Dispatch { target, handled_by }
    }

    fn key_target(&self) -> ActorId {
        [self.selected, self.hovered]
            .into_iter()
            .flatten()
            .find(|id| self.is_attached(*id))
            .unwrap_or(self.root)
    }

    fn bubble(&mut self, target: ActorId, event: &InputEvent) -> Option<ActorId> {
        let mut current = Some(target);
        while let Some(id) = current {
            let parent = self.parent(id);
            if !self.is_disabled(id) {
                let local = ActorEvent::from_input(event, self.find_offset(id));
                if self.deliver(id, &local).is_handled() {
                    return Some(id);
                }
            }
            current = parent.filter(|p| self.contains(*p));
        }
        None
    }

    /// Behaviours in attachment order, then the actor's own handler.
    fn deliver(&mut self, id: ActorId, event: &ActorEvent) -> EventResult {
        for i in 0..self.behaviour_count(id) {
            let result = self.with_behaviour_slot(id, i, true, |b, cx| b.event(cx, event));
            if result == Some(EventResult::Handled) {
                return EventResult::Handled;
            }
        }
        self.with_delegate(id, |d, cx| d.on_event(cx, event))
            .unwrap_or(EventResult::Ignored)
    }

    fn update_hover(&mut self, hit: Option<ActorId>) {
        if self.hovered == hit {
            return;
        }
        let old = std::mem::replace(&mut self.hovered, hit);
        if let Some(old) = old.filter(|id| self.contains(*id)) {
            self.deliver(old, &ActorEvent::Leave);
        }
        if let Some(new) = hit {
            self.deliver(new, &ActorEvent::Enter);
        }
    }

    /// Forget the hovered actor, sending it `Leave`.
    pub fn clear_hover(&mut self) {
        self.update_hover(None);
    }

    /// Topmost enabled actor containing the window position `pos`.
    ///
    /// Children are tested from the highest z down; among equal z the later
    /// child wins, matching paint order. Disabled actors and their subtrees
    /// are transparent to the pointer, and scrollable actors clip their
    /// children.
    pub fn hit_test(&self, pos: [f32; 2]) -> Option<ActorId> {
        self.hit_actor(self.root, pos)
    }

    /// `pos` is in the coordinate space `id`'s region is expressed in.
    fn hit_actor(&self, id: ActorId, pos: [f32; 2]) -> Option<ActorId> {
        let node = self.actors.get(id)?;
        if node.disabled || (id != self.root && !node.region.has_area()) {
            return None;
        }
        let inside = node.region.contains(pos);
        if node.scrollable.is_some() && !inside {
            return None;
        }

        let scroll = node.scroll_offset();
        let content = [
            pos[0] - node.region.x1 + scroll[0],
            pos[1] - node.region.y1 + scroll[1],
        ];
        let mut children = node.children.clone();
        children.sort_by_key(|c| self.actors.get(*c).map_or(0, |n| n.z));
        if let Some(hit) = children.iter().rev().find_map(|c| self.hit_actor(*c, content)) {
            return Some(hit);
        }
        inside.then_some(id)
    }

    /// Feed a winit window event into the scene. Returns the dispatch for
    /// events that were routed to actors.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<Dispatch> {
        let modifiers = self.modifiers;
        match event {
            WindowEvent::CursorMoved { position, .. } => Some(self.dispatch(&InputEvent::PointerMove {
                x: position.x as f32,
                y: position.y as f32,
                modifiers,
            })),
            WindowEvent::MouseInput { state, button, .. } => {
                let [x, y] = self.pointer?;
                let button = *button;
                let event = match state {
                    ElementState::Pressed => InputEvent::ButtonPress { x, y, button, modifiers },
                    ElementState::Released => InputEvent::ButtonRelease { x, y, button, modifiers },
                };
                Some(self.dispatch(&event))
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let [x, y] = self.pointer?;
                let (dx, dy) = match *delta {
                    MouseScrollDelta::LineDelta(dx, dy) => (dx * LINE_SCROLL, dy * LINE_SCROLL),
                    MouseScrollDelta::PixelDelta(p) => (p.x as f32, p.y as f32),
                };
                Some(self.dispatch(&InputEvent::Scroll { x, y, dx, dy, modifiers }))
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return None;
                };
                let event = match event.state {
                    ElementState::Pressed => InputEvent::KeyPress { key, modifiers },
                    ElementState::Released => InputEvent::KeyRelease { key, modifiers },
                };
                Some(self.dispatch(&event))
            }
            WindowEvent::ModifiersChanged(m) => {
                self.modifiers = m.state();
                None
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer = None;
                self.clear_hover();
                None
            }
            WindowEvent::Resized(size) => {
                self.set_size(size.width, size.height);
                None
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.draw() {
                    log::error!("frame not drawn: {e}");
                }
                None
            }
            _ => None,
        }
    }
}
