//! agl-core: render boundary for the agl scenegraph.
//!
//! Scenes record drawing into a [`DisplayList`] through a [`Painter`] and hand
//! finished frames to a [`RenderContext`]. The software context rasterizes
//! on the CPU; the wgpu context renders on the GPU with pooled cache targets.

/// Callers building a [`WgpuContext`] on their own device use this wgpu.
pub use wgpu;

mod allocator;
mod color;
mod context;
mod display_list;
mod error;
mod geometry;
mod gpu;
mod painter;
mod software;

pub use allocator::{CACHE_FORMAT, OwnedTexture, TexKey, WgpuTargetPool};
pub use color::{Color, ColorLinPremul, DIM_OPACITY};
pub use context::{ContextType, ProgramId, RenderContext, RenderTarget, TargetAllocator, TargetId};
pub use display_list::{Command, DisplayList, Viewport};
pub use error::{RenderError, Result};
pub use geometry::{IRegion, Rect, Region, Transform2D};
pub use gpu::{
    Draw, DrawKind, PassPlan, PassSurface, SolidVertex, TexVertex, WgpuContext, WgpuHandle, plan_passes,
};
pub use painter::Painter;
pub use software::{MAX_TARGET_SIZE, SoftwareContext, SoftwareHandle};
