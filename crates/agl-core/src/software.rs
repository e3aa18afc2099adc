//! CPU render context backed by tiny-skia.
//!
//! [`SoftwareContext`] executes display lists into an in-memory frame, keeps
//! one pixmap per cache target, and exposes a cloneable [`SoftwareHandle`]
//! for inspecting what was drawn. It backs headless runs and the scene tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use tiny_skia::{FillRule, FilterQuality, Mask, Paint, PathBuilder, Pattern, Pixmap, SpreadMode};

use crate::context::{ContextType, RenderContext, RenderTarget, TargetAllocator, TargetId};
use crate::display_list::{Command, DisplayList};
use crate::error::{RenderError, Result};
use crate::geometry::{Rect, Transform2D};

/// Largest target edge the software context will allocate.
pub const MAX_TARGET_SIZE: u32 = 8192;

struct SoftwareState {
    frame: Option<Pixmap>,
    targets: HashMap<TargetId, Pixmap>,
    next_target: u64,
    current: bool,
    available: bool,
    fail_allocations: bool,
    presented: usize,
    last_frame: Option<DisplayList>,
}

/// Render context that rasterizes on the CPU.
pub struct SoftwareContext {
    state: Rc<RefCell<SoftwareState>>,
}

/// Shared view into a [`SoftwareContext`] that stays usable after the
/// context has been handed to a scene.
#[derive(Clone)]
pub struct SoftwareHandle {
    state: Rc<RefCell<SoftwareState>>,
}

impl Default for SoftwareContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareContext {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SoftwareState {
                frame: None,
                targets: HashMap::new(),
                next_target: 1,
                current: false,
                available: true,
                fail_allocations: false,
                presented: 0,
                last_frame: None,
            })),
        }
    }

    pub fn handle(&self) -> SoftwareHandle {
        SoftwareHandle { state: self.state.clone() }
    }
}

impl TargetAllocator for SoftwareContext {
    fn create_target(&mut self, width: u32, height: u32) -> Result<RenderTarget> {
        let mut state = self.state.borrow_mut();
        if state.fail_allocations {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: "allocation disabled".into(),
            });
        }
        if width > MAX_TARGET_SIZE || height > MAX_TARGET_SIZE {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: format!("exceeds {MAX_TARGET_SIZE}px"),
            });
        }
        let pixmap = Pixmap::new(width, height).ok_or_else(|| RenderError::TargetAllocation {
            width,
            height,
            reason: "empty size".into(),
        })?;
        let id = TargetId(state.next_target);
        state.next_target += 1;
        state.targets.insert(id, pixmap);
        Ok(RenderTarget { id, width, height })
    }

    fn release_target(&mut self, target: RenderTarget) {
        if self.state.borrow_mut().targets.remove(&target.id).is_none() {
            log::warn!("release of unknown software target {:?}", target.id);
        }
    }

    fn live_targets(&self) -> usize {
        self.state.borrow().targets.len()
    }
}

impl RenderContext for SoftwareContext {
    fn kind(&self) -> ContextType {
        ContextType::Offscreen
    }

    fn make_current(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.available {
            return Err(RenderError::ContextUnavailable("software context disabled".into()));
        }
        state.current = true;
        Ok(())
    }

    fn clear_current(&mut self) {
        self.state.borrow_mut().current = false;
    }

    fn present(&mut self, frame: &DisplayList) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let (w, h) = (frame.viewport.width, frame.viewport.height);
        let pixmap = match state.frame.take() {
            Some(p) if p.width() == w && p.height() == h => Some(p),
            _ => Pixmap::new(w, h),
        };
        if let Some(pixmap) = pixmap {
            state.frame = Some(rasterize(frame, pixmap, &mut state.targets));
        }
        state.presented += 1;
        state.last_frame = Some(frame.clone());
        Ok(())
    }
}

impl SoftwareHandle {
    /// Number of frames presented so far.
    pub fn frames_presented(&self) -> usize {
        self.state.borrow().presented
    }

    pub fn live_targets(&self) -> usize {
        self.state.borrow().targets.len()
    }

    pub fn is_current(&self) -> bool {
        self.state.borrow().current
    }

    /// Make subsequent target allocations fail.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.state.borrow_mut().fail_allocations = fail;
    }

    /// Make [`RenderContext::make_current`] fail while `false`.
    pub fn set_available(&self, available: bool) {
        self.state.borrow_mut().available = available;
    }

    /// Premultiplied RGBA bytes of the last presented frame.
    pub fn pixels(&self) -> Option<Vec<u8>> {
        self.state.borrow().frame.as_ref().map(|p| p.data().to_vec())
    }

    /// Unpremultiplied RGBA of one pixel of the last presented frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let state = self.state.borrow();
        let c = state.frame.as_ref()?.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// The display list of the last presented frame.
    pub fn last_frame(&self) -> Option<DisplayList> {
        self.state.borrow().last_frame.clone()
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let state = self.state.borrow();
        let frame = state
            .frame
            .as_ref()
            .ok_or_else(|| RenderError::Present("no frame presented".into()))?;
        frame
            .save_png(path.as_ref())
            .map_err(|e| RenderError::Present(e.to_string()))
    }
}

struct Surface {
    pixmap: Pixmap,
    target: Option<TargetId>,
    /// Device-space clip rectangles, each already intersected with its parent.
    clips: Vec<Rect>,
    dim: usize,
}

impl Surface {
    fn new(pixmap: Pixmap, target: Option<TargetId>) -> Self {
        Self { pixmap, target, clips: Vec::new(), dim: 0 }
    }

    fn mask(&self) -> Option<Option<Mask>> {
        let Some(clip) = self.clips.last() else {
            return Some(None);
        };
        if clip.is_empty() {
            return None;
        }
        let rect = tiny_skia::Rect::from_xywh(clip.x, clip.y, clip.w, clip.h)?;
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
        let path = PathBuilder::from_rect(rect);
        mask.fill_path(&path, FillRule::Winding, false, tiny_skia::Transform::identity());
        Some(Some(mask))
    }
}

fn to_skia(t: &Transform2D) -> tiny_skia::Transform {
    let [a, b, c, d, e, f] = t.m;
    tiny_skia::Transform::from_row(a, b, c, d, e, f)
}

fn current<'a>(stack: &'a mut [Surface], frame: &'a mut Surface) -> &'a mut Surface {
    match stack.last_mut() {
        Some(surface) => surface,
        None => frame,
    }
}

fn rasterize(list: &DisplayList, frame: Pixmap, targets: &mut HashMap<TargetId, Pixmap>) -> Pixmap {
    let mut frame = Surface::new(frame, None);
    // Cache targets currently being rendered into, innermost last.
    let mut stack: Vec<Surface> = Vec::new();

    for cmd in &list.commands {
        match cmd {
            Command::Clear(color) => {
                let [r, g, b, a] = color.to_srgba_u8();
                current(&mut stack, &mut frame)
                    .pixmap
                    .fill(tiny_skia::Color::from_rgba8(r, g, b, a));
            }
            Command::FillRect { rect, color, transform } => {
                let surface = current(&mut stack, &mut frame);
                let color = if surface.dim > 0 { color.dimmed() } else { *color };
                let [r, g, b, a] = color.to_srgba_u8();
                let Some(skia_rect) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.w, rect.h) else {
                    continue;
                };
                let Some(mask) = surface.mask() else { continue };
                let mut paint = Paint::default();
                paint.set_color_rgba8(r, g, b, a);
                paint.anti_alias = false;
                surface
                    .pixmap
                    .fill_rect(skia_rect, &paint, to_skia(transform), mask.as_ref());
            }
            Command::DrawTarget { target, dest, src_origin, transform } => {
                let Some(src) = targets.get(target) else {
                    log::warn!("draw of unknown or active target {:?}", target);
                    continue;
                };
                let surface = current(&mut stack, &mut frame);
                let Some(skia_rect) = tiny_skia::Rect::from_xywh(dest.x, dest.y, dest.w, dest.h) else {
                    continue;
                };
                let Some(mask) = surface.mask() else { continue };
                // Target content already carries the dim state it was recorded under.
                let shader = Pattern::new(
                    src.as_ref(),
                    SpreadMode::Pad,
                    FilterQuality::Nearest,
                    1.0,
                    tiny_skia::Transform::from_translate(dest.x - src_origin[0], dest.y - src_origin[1]),
                );
                let paint = Paint { shader, anti_alias: false, ..Default::default() };
                surface
                    .pixmap
                    .fill_rect(skia_rect, &paint, to_skia(transform), mask.as_ref());
            }
            Command::PushClip { rect, transform } => {
                let surface = current(&mut stack, &mut frame);
                let device = transform.map_rect(*rect);
                let clip = match surface.clips.last() {
                    Some(parent) => parent.intersect(&device).unwrap_or_default(),
                    None => device,
                };
                surface.clips.push(clip);
            }
            Command::PopClip => {
                current(&mut stack, &mut frame).clips.pop();
            }
            Command::PushDim => {
                current(&mut stack, &mut frame).dim += 1;
            }
            Command::PopDim => {
                let surface = current(&mut stack, &mut frame);
                surface.dim = surface.dim.saturating_sub(1);
            }
            Command::BeginTarget { target, .. } => match targets.remove(target) {
                Some(pixmap) => stack.push(Surface::new(pixmap, Some(*target))),
                None => {
                    log::warn!("render into unknown target {:?}", target);
                    if let Some(scratch) = Pixmap::new(1, 1) {
                        stack.push(Surface::new(scratch, None));
                    }
                }
            },
            Command::EndTarget => {
                if let Some(Surface { pixmap, target: Some(id), .. }) = stack.pop() {
                    targets.insert(id, pixmap);
                }
            }
            Command::UseProgram(_) | Command::PushTransform(_) | Command::PopTransform => {}
        }
    }

    while let Some(surface) = stack.pop() {
        if let Some(id) = surface.target {
            targets.insert(id, surface.pixmap);
        }
    }
    frame.pixmap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::display_list::Viewport;
    use crate::painter::Painter;

    const RED: u32 = 0xff0000ff;

    #[test]
    fn test_fill_and_clear() {
        let mut ctx = SoftwareContext::new();
        let handle = ctx.handle();
        let mut p = Painter::begin_frame(Viewport { width: 8, height: 8 });
        p.clear(Color::from_rgba_u32(0x000000ff));
        p.fill_rect(Rect::new(2.0, 2.0, 2.0, 2.0), Color::from_rgba_u32(RED));
        ctx.present(&p.finish()).unwrap();

        assert_eq!(handle.frames_presented(), 1);
        assert_eq!(handle.pixel(3, 3), Some([255, 0, 0, 255]));
        assert_eq!(handle.pixel(5, 5), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_clip_limits_fill() {
        let mut ctx = SoftwareContext::new();
        let handle = ctx.handle();
        let mut p = Painter::begin_frame(Viewport { width: 8, height: 8 });
        p.clear(Color::from_rgba_u32(0x000000ff));
        p.push_clip_rect(Rect::new(0.0, 0.0, 4.0, 8.0));
        p.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Color::from_rgba_u32(RED));
        p.pop_clip();
        ctx.present(&p.finish()).unwrap();

        assert_eq!(handle.pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(handle.pixel(6, 1), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_target_blit_matches_direct_paint() {
        let mut ctx = SoftwareContext::new();
        let handle = ctx.handle();
        let target = ctx.create_target(4, 4).unwrap();

        let mut p = Painter::begin_frame(Viewport { width: 8, height: 8 });
        p.clear(Color::from_rgba_u32(0x000000ff));
        p.begin_target(&target);
        p.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::from_rgba_u32(RED));
        p.end_target();
        p.push_transform(Transform2D::translate(2.0, 2.0));
        p.draw_target(&target, Rect::new(0.0, 0.0, 4.0, 4.0), [0.0, 0.0]);
        p.pop_transform();
        ctx.present(&p.finish()).unwrap();
        let first = handle.pixels().unwrap();

        // Second frame only blits the already rendered target.
        let mut p = Painter::begin_frame(Viewport { width: 8, height: 8 });
        p.clear(Color::from_rgba_u32(0x000000ff));
        p.push_transform(Transform2D::translate(2.0, 2.0));
        p.draw_target(&target, Rect::new(0.0, 0.0, 4.0, 4.0), [0.0, 0.0]);
        p.pop_transform();
        ctx.present(&p.finish()).unwrap();

        assert_eq!(handle.pixels().unwrap(), first);
        assert_eq!(handle.pixel(3, 3), Some([255, 0, 0, 255]));
        assert_eq!(handle.pixel(1, 1), Some([0, 0, 0, 255]));
    }

    fn close(a: [u8; 4], b: [u8; 4]) -> bool {
        a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 2)
    }

    #[test]
    fn test_dimmed_target_matches_dimmed_fill() {
        let mut ctx = SoftwareContext::new();
        let handle = ctx.handle();
        let target = ctx.create_target(4, 4).unwrap();

        let mut p = Painter::begin_frame(Viewport { width: 8, height: 8 });
        p.clear(Color::from_rgba_u32(0x000000ff));
        p.push_dim();
        p.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::from_rgba_u32(RED));
        p.begin_target(&target);
        p.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::from_rgba_u32(RED));
        p.end_target();
        p.draw_target(&target, Rect::new(4.0, 4.0, 4.0, 4.0), [0.0, 0.0]);
        p.pop_dim();
        ctx.present(&p.finish()).unwrap();

        let direct = handle.pixel(1, 1).unwrap();
        let blitted = handle.pixel(5, 5).unwrap();
        assert_eq!(direct[0], direct[1]);
        assert!(direct[0] > 0 && direct[0] < 255);
        assert!(close(direct, blitted), "direct={direct:?} blitted={blitted:?}");
    }

    #[test]
    fn test_allocation_failure_switch() {
        let mut ctx = SoftwareContext::new();
        let handle = ctx.handle();
        handle.set_fail_allocations(true);
        assert!(matches!(
            ctx.create_target(4, 4),
            Err(RenderError::TargetAllocation { width: 4, height: 4, .. })
        ));
        handle.set_fail_allocations(false);
        let t = ctx.create_target(4, 4).unwrap();
        assert_eq!(handle.live_targets(), 1);
        ctx.release_target(t);
        assert_eq!(handle.live_targets(), 0);
    }

    #[test]
    fn test_unavailable_context() {
        let mut ctx = SoftwareContext::new();
        let handle = ctx.handle();
        handle.set_available(false);
        assert!(ctx.make_current().is_err());
        handle.set_available(true);
        ctx.make_current().unwrap();
        assert!(handle.is_current());
        ctx.clear_current();
        assert!(!handle.is_current());
    }
}
