use std::any::Any;

use crate::actor::ActorCx;
use crate::behaviour::Behaviour;

/// Recomputes one piece of derived state. Returns `false` while it cannot
/// complete yet.
pub type Resolver = Box<dyn FnMut(&mut ActorCx<'_>) -> bool>;

/// Aggregates independent validity bits behind a single idle check.
///
/// Marking a bit dirty queues idle work for the actor. The idle pass runs
/// the resolvers of dirty bits in index order and stops at the first one
/// that cannot resolve, leaving it and every later bit dirty. Later
/// resolvers may rely on earlier ones having completed.
pub struct Invalidator {
    resolvers: Vec<Resolver>,
    dirty: u64,
}

impl Invalidator {
    /// # Panics
    /// Panics with more than 64 resolvers.
    pub fn new(resolvers: Vec<Resolver>) -> Self {
        assert!(resolvers.len() <= 64, "an invalidator holds at most 64 bits");
        Self { resolvers, dirty: 0 }
    }

    /// Mark `bit` dirty and queue a check.
    pub fn invalidate(&mut self, cx: &mut ActorCx<'_>, bit: usize) {
        assert!(bit < self.resolvers.len(), "invalidator bit {bit} out of range");
        self.dirty |= 1 << bit;
        let id = cx.id();
        cx.scene.queue_idle(id);
    }

    pub fn is_dirty(&self, bit: usize) -> bool {
        bit < 64 && self.dirty & (1 << bit) != 0
    }

    pub fn is_clean(&self) -> bool {
        self.dirty == 0
    }
}

impl Behaviour for Invalidator {
    fn idle(&mut self, cx: &mut ActorCx<'_>) {
        let mut resolved = false;
        for (bit, resolve) in self.resolvers.iter_mut().enumerate() {
            if self.dirty & (1 << bit) == 0 {
                continue;
            }
            if !resolve(cx) {
                break;
            }
            self.dirty &= !(1 << bit);
            resolved = true;
        }
        if resolved {
            cx.invalidate();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
