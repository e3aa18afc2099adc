//! Time-based interpolation of scalar properties.
//!
//! # Architecture
//!
//! ```text
//! AnimationRunner (owns the running list, driven by a FrameClock)
//!   └── Animation
//!         └── member groups ── Weak ──> Animatable (owned by actors)
//! ```
//!
//! Each tick writes `(1 - f) * start + f * target` into every member, with
//! `f` the eased fraction of the animation's time window.

pub mod clock;
pub mod easing;
pub mod runner;
pub mod types;

pub use clock::{FrameClock, ManualClock, SystemClock};
pub use easing::{EasingFunction, StepPosition};
pub use runner::{
    AnimationRunner, DEFAULT_FRAME_INTERVAL, DEFAULT_LENGTH, FinishCallback, FrameCallback,
    TickReport,
};
pub use types::{Animatable, AnimationId, Scalar, ScalarKind};
