//! The boundary between the scenegraph and a windowing/GPU provider.
//!
//! A scene talks to exactly one [`RenderContext`] for its lifetime. The
//! context is responsible for binding itself as the current drawing context,
//! presenting finished frames, and handing out off-screen targets used as
//! per-actor render caches.

use crate::display_list::DisplayList;
use crate::error::Result;

/// Windowing system a context is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextType {
    Gtk,
    Sdl,
    Glx,
    /// No window; frames are rendered into memory.
    Offscreen,
}

/// Identifier of an off-screen render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

/// Identifier of a shader program known to the context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// An off-screen surface that can be rendered into and then drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTarget {
    pub id: TargetId,
    pub width: u32,
    pub height: u32,
}

/// Allocation of off-screen render targets.
pub trait TargetAllocator {
    /// Create a target of at least `width` x `height` pixels.
    fn create_target(&mut self, width: u32, height: u32) -> Result<RenderTarget>;

    /// Return a target. Its id must not be used afterwards.
    fn release_target(&mut self, target: RenderTarget);

    /// Number of targets currently handed out.
    fn live_targets(&self) -> usize;
}

/// A windowing/GPU context a scene renders through.
pub trait RenderContext: TargetAllocator {
    fn kind(&self) -> ContextType;

    /// Bind the context for drawing.
    fn make_current(&mut self) -> Result<()>;

    /// Release the binding made by [`make_current`](Self::make_current).
    fn clear_current(&mut self);

    /// Execute and show a finished frame.
    fn present(&mut self, frame: &DisplayList) -> Result<()>;
}
