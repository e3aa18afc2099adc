use crate::color::Color;
use crate::context::{ProgramId, RenderTarget};
use crate::display_list::{Command, DisplayList, Viewport};
use crate::geometry::{Rect, Transform2D};

/// Records drawing into a [`DisplayList`].
///
/// Transforms compose as they are pushed. Beginning a cache target starts a
/// fresh transform stack so that target content is recorded in target space;
/// ending it restores the enclosing stack.
pub struct Painter {
    list: DisplayList,
    transform_stack: Vec<Transform2D>,
    clip_depth: usize,
    dim_depth: usize,
    /// Saved `(transform_stack, clip_depth, dim_depth)` of enclosing surfaces.
    surfaces: Vec<(Vec<Transform2D>, usize, usize)>,
}

impl Painter {
    pub fn begin_frame(viewport: Viewport) -> Self {
        Self {
            list: DisplayList {
                viewport,
                commands: Vec::new(),
            },
            transform_stack: vec![Transform2D::identity()],
            clip_depth: 0,
            dim_depth: 0,
            surfaces: Vec::new(),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.list.viewport
    }

    pub fn current_transform(&self) -> Transform2D {
        self.transform_stack
            .last()
            .copied()
            .unwrap_or_else(Transform2D::identity)
    }

    pub fn push_transform(&mut self, t: Transform2D) {
        // Compose with current transform so nested pushes multiply.
        let composed = self.current_transform().concat(t);
        self.list.commands.push(Command::PushTransform(composed));
        self.transform_stack.push(composed);
    }

    pub fn pop_transform(&mut self) {
        if self.transform_stack.len() > 1 {
            self.list.commands.push(Command::PopTransform);
            let _ = self.transform_stack.pop();
        }
    }

    pub fn push_clip_rect(&mut self, rect: Rect) {
        self.clip_depth += 1;
        let transform = self.current_transform();
        self.list.commands.push(Command::PushClip { rect, transform });
    }

    pub fn pop_clip(&mut self) {
        if self.clip_depth > 0 {
            self.clip_depth -= 1;
            self.list.commands.push(Command::PopClip);
        }
    }

    pub fn push_dim(&mut self) {
        self.dim_depth += 1;
        self.list.commands.push(Command::PushDim);
    }

    pub fn pop_dim(&mut self) {
        if self.dim_depth > 0 {
            self.dim_depth -= 1;
            self.list.commands.push(Command::PopDim);
        }
    }

    pub fn is_dimmed(&self) -> bool {
        self.dim_depth > 0
    }

    pub fn clear(&mut self, color: Color) {
        self.list.commands.push(Command::Clear(color));
    }

    pub fn use_program(&mut self, program: Option<ProgramId>) {
        self.list.commands.push(Command::UseProgram(program));
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let t = self.current_transform();
        self.list.commands.push(Command::FillRect {
            rect,
            color,
            transform: t,
        });
    }

    /// Redirect drawing into `target` until [`end_target`](Self::end_target).
    ///
    /// A target begun inside a dimmed section records its content dimmed, so
    /// the later blit draws it unchanged and matches direct painting.
    pub fn begin_target(&mut self, target: &RenderTarget) {
        let saved = std::mem::replace(&mut self.transform_stack, vec![Transform2D::identity()]);
        let dimmed = self.is_dimmed();
        self.surfaces.push((saved, self.clip_depth, self.dim_depth));
        self.clip_depth = 0;
        self.dim_depth = 0;
        self.list.commands.push(Command::BeginTarget {
            target: target.id,
            width: target.width,
            height: target.height,
        });
        self.list.commands.push(Command::Clear(Color::TRANSPARENT));
        if dimmed {
            self.push_dim();
        }
    }

    pub fn end_target(&mut self) {
        let Some((stack, clip_depth, dim_depth)) = self.surfaces.pop() else {
            log::warn!("end_target without a matching begin_target");
            return;
        };
        // Unbalanced pushes inside the target are closed before leaving it.
        for _ in 0..self.clip_depth {
            self.list.commands.push(Command::PopClip);
        }
        for _ in 0..self.dim_depth {
            self.list.commands.push(Command::PopDim);
        }
        for _ in 1..self.transform_stack.len() {
            self.list.commands.push(Command::PopTransform);
        }
        self.transform_stack = stack;
        self.clip_depth = clip_depth;
        self.dim_depth = dim_depth;
        self.list.commands.push(Command::EndTarget);
    }

    /// Draw a cache target into `dest`, sampling from `src_origin` in target space.
    pub fn draw_target(&mut self, target: &RenderTarget, dest: Rect, src_origin: [f32; 2]) {
        let t = self.current_transform();
        self.list.commands.push(Command::DrawTarget {
            target: target.id,
            dest,
            src_origin,
            transform: t,
        });
    }

    /// Get a reference to the display list recorded so far.
    pub fn display_list(&self) -> &DisplayList {
        &self.list
    }

    pub fn finish(self) -> DisplayList {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TargetId;

    #[test]
    fn test_nested_transforms_compose() {
        let mut p = Painter::begin_frame(Viewport { width: 10, height: 10 });
        p.push_transform(Transform2D::translate(2.0, 3.0));
        p.push_transform(Transform2D::translate(1.0, 1.0));
        assert_eq!(p.current_transform().apply([0.0, 0.0]), [3.0, 4.0]);
        p.pop_transform();
        p.pop_transform();
        assert!(p.current_transform().is_translation());
        assert_eq!(p.current_transform().apply([0.0, 0.0]), [0.0, 0.0]);
    }

    #[test]
    fn test_target_starts_in_target_space() {
        let target = RenderTarget { id: TargetId(7), width: 4, height: 4 };
        let mut p = Painter::begin_frame(Viewport { width: 10, height: 10 });
        p.push_transform(Transform2D::translate(5.0, 5.0));
        p.begin_target(&target);
        assert_eq!(p.current_transform(), Transform2D::identity());
        p.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::TRANSPARENT);
        p.end_target();
        assert_eq!(p.current_transform().apply([0.0, 0.0]), [5.0, 5.0]);

        let list = p.finish();
        assert_eq!(list.target_renders(), 1);
        let surface: Vec<_> = list.surface_commands().collect();
        assert_eq!(surface.len(), 1);
        assert!(matches!(surface[0], Command::PushTransform(_)));
    }

    #[test]
    fn test_target_inherits_dim() {
        let target = RenderTarget { id: TargetId(3), width: 4, height: 4 };
        let mut p = Painter::begin_frame(Viewport { width: 10, height: 10 });
        p.push_dim();
        p.begin_target(&target);
        assert!(p.is_dimmed());
        p.end_target();
        assert!(p.is_dimmed());
        p.pop_dim();
        assert!(!p.is_dimmed());

        let list = p.finish();
        let inside: Vec<_> = list
            .commands
            .iter()
            .skip_while(|c| !matches!(c, Command::BeginTarget { .. }))
            .take_while(|c| !matches!(c, Command::EndTarget))
            .collect();
        assert!(inside.iter().any(|c| matches!(c, Command::PushDim)));
        assert!(inside.iter().any(|c| matches!(c, Command::PopDim)));
    }
}
