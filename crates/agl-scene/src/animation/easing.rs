//! Timing curves applied to animation progress.
//!
//! Every animation carries one curve per [`ScalarKind`](super::ScalarKind);
//! all three default to [`EasingFunction::Linear`].

use serde::{Deserialize, Serialize};

/// Where the jumps of a stepped curve happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPosition {
    Start,
    #[default]
    End,
    Both,
    None,
}

/// Maps linear progress in `[0, 1]` to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    #[default]
    Linear,
    /// `cubic-bezier(0.25, 0.1, 0.25, 1.0)`
    Ease,
    /// `cubic-bezier(0.42, 0, 1, 1)`
    EaseIn,
    /// `cubic-bezier(0, 0, 0.58, 1)`
    EaseOut,
    /// `cubic-bezier(0.42, 0, 0.58, 1)`
    EaseInOut,
    CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },
    Steps { count: u32, position: StepPosition },
}

impl EasingFunction {
    /// Eased progress at `t`. Input is clamped to `[0, 1]`; bezier output may
    /// overshoot that range.
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Self::Linear => t,
            Self::Ease => Bezier::new(0.25, 0.1, 0.25, 1.0).y_for_x(t),
            Self::EaseIn => Bezier::new(0.42, 0.0, 1.0, 1.0).y_for_x(t),
            Self::EaseOut => Bezier::new(0.0, 0.0, 0.58, 1.0).y_for_x(t),
            Self::EaseInOut => Bezier::new(0.42, 0.0, 0.58, 1.0).y_for_x(t),
            Self::CubicBezier { x1, y1, x2, y2 } => Bezier::new(x1, y1, x2, y2).y_for_x(t),
            Self::Steps { count, position } => stepped(count, position, t),
        }
    }

    /// # Panics
    /// Panics if `x1` or `x2` is outside `[0, 1]`.
    pub fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2),
            "bezier x values must be in [0, 1]"
        );
        Self::CubicBezier { x1, y1, x2, y2 }
    }

    /// # Panics
    /// Panics if `count` is 0.
    pub fn steps(count: u32, position: StepPosition) -> Self {
        assert!(count >= 1, "step count must be at least 1");
        Self::Steps { count, position }
    }
}

/// Cubic bezier through (0,0) and (1,1) with two control points.
struct Bezier {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Bezier {
    fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn y_for_x(&self, x: f32) -> f32 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        let t = self.solve_t(x);
        Self::component(self.y1, self.y2, t)
    }

    // Newton-Raphson on x(t) = x.
    fn solve_t(&self, x: f32) -> f32 {
        let mut t = x;
        for _ in 0..8 {
            let err = Self::component(self.x1, self.x2, t) - x;
            if err.abs() < 1e-6 {
                break;
            }
            let slope = self.dx_dt(t);
            if slope.abs() < 1e-6 {
                break;
            }
            t = (t - err / slope).clamp(0.0, 1.0);
        }
        t
    }

    /// 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
    #[inline]
    fn component(p1: f32, p2: f32, t: f32) -> f32 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
    }

    #[inline]
    fn dx_dt(&self, t: f32) -> f32 {
        let mt = 1.0 - t;
        3.0 * mt * mt * self.x1 + 6.0 * mt * t * (self.x2 - self.x1) + 3.0 * t * t * (1.0 - self.x2)
    }
}

fn stepped(count: u32, position: StepPosition, t: f32) -> f32 {
    let n = count.max(1) as f32;
    match position {
        StepPosition::Start => (t * n).ceil() / n,
        StepPosition::End => (t * n).floor() / n,
        StepPosition::Both => ((t * (n + 1.0)).floor() / n).min(1.0),
        StepPosition::None if count <= 1 => 0.5,
        StepPosition::None => ((t * n).floor() / (n - 1.0)).min(1.0),
    }
}
