use std::any::Any;

use crate::actor::{ActorCx, ActorId};
use crate::behaviour::Behaviour;

/// Keeps the actor positioned over another actor, wherever either sits in
/// the tree. Used for cursors and overlays.
#[derive(Debug, Clone)]
pub struct Follow {
    target: ActorId,
    dx: f32,
    dy: f32,
    mirror_size: bool,
}

impl Follow {
    pub fn new(target: ActorId) -> Self {
        Self { target, dx: 0.0, dy: 0.0, mirror_size: false }
    }

    /// Offset from the target's absolute position.
    pub fn offset(mut self, dx: f32, dy: f32) -> Self {
        self.dx = dx;
        self.dy = dy;
        self
    }

    /// Also take the target's width and height.
    pub fn mirror_size(mut self, mirror: bool) -> Self {
        self.mirror_size = mirror;
        self
    }

    pub fn target(&self) -> ActorId {
        self.target
    }
}

impl Behaviour for Follow {
    fn layout(&mut self, cx: &mut ActorCx<'_>) {
        let id = cx.id();
        let own = cx.region();
        let scene = &mut *cx.scene;
        let Some(target_region) = scene.actor(self.target).map(|n| n.region()) else {
            return;
        };
        let Some(parent) = scene.parent(id) else {
            return;
        };
        let target_abs = scene.find_offset(self.target);
        let base = scene.content_origin(parent);

        let x = target_abs[0] + self.dx - base[0];
        let y = target_abs[1] + self.dy - base[1];
        let mut region = own.moved_to(x, y);
        if self.mirror_size {
            region.x2 = x + target_region.width();
            region.y2 = y + target_region.height();
        }
        if region != own {
            scene.set_region(id, region);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
