use crate::color::Color;
use crate::context::{ProgramId, TargetId};
use crate::geometry::{Rect, Transform2D};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clear the current surface (window or cache target).
    Clear(Color),
    FillRect { rect: Rect, color: Color, transform: Transform2D },
    /// Blit a cache target as recorded, regardless of the current dim state.
    /// `src_origin` is the point in target space that lands on `dest`'s origin.
    DrawTarget { target: TargetId, dest: Rect, src_origin: [f32; 2], transform: Transform2D },
    /// Shader program for subsequent fills. Backends without programs ignore it.
    UseProgram(Option<ProgramId>),
    PushClip { rect: Rect, transform: Transform2D },
    PopClip,
    PushTransform(Transform2D),
    PopTransform,
    /// Everything until the matching `PopDim` is drawn desaturated at reduced opacity.
    PushDim,
    PopDim,
    /// Redirect drawing into a cache target until the matching `EndTarget`.
    BeginTarget { target: TargetId, width: u32, height: u32 },
    EndTarget,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    pub viewport: Viewport,
    pub commands: Vec<Command>,
}

impl DisplayList {
    /// Commands drawn on the window surface, skipping anything rendered into cache targets.
    pub fn surface_commands(&self) -> impl Iterator<Item = &Command> + '_ {
        let mut depth = 0usize;
        self.commands.iter().filter(move |cmd| match cmd {
            Command::BeginTarget { .. } => {
                depth += 1;
                false
            }
            Command::EndTarget => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
    }

    /// Number of cache targets (re)rendered by this frame.
    pub fn target_renders(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::BeginTarget { .. }))
            .count()
    }
}
