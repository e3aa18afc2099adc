//! Core animation types.
//!
//! - `Scalar`: the value carried by an animatable property
//! - `Animatable`: a shared property cell animations write into
//! - `AnimationId`: identifier handed out by the runner

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

/// Identifier of an animation within one [`AnimationRunner`](super::AnimationRunner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimationId(pub u64);

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim#{}", self.0)
    }
}

/// Storage type of an animatable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Int,
    Int64,
    Float,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 3] = [ScalarKind::Int, ScalarKind::Int64, ScalarKind::Float];

    pub(crate) fn index(self) -> usize {
        match self {
            ScalarKind::Int => 0,
            ScalarKind::Int64 => 1,
            ScalarKind::Float => 2,
        }
    }
}

/// A value an animation can drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Int(i32),
    Int64(i64),
    Float(f32),
}

impl Default for Scalar {
    fn default() -> Self {
        Self::Float(0.0)
    }
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Int64(_) => ScalarKind::Int64,
            Scalar::Float(_) => ScalarKind::Float,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Int(v) => v as f64,
            Scalar::Int64(v) => v as f64,
            Scalar::Float(v) => v as f64,
        }
    }

    /// Convert a float back into this value's storage type.
    ///
    /// Integer kinds truncate toward zero; they do not round.
    pub fn with_f64(&self, v: f64) -> Scalar {
        match self {
            Scalar::Int(_) => Scalar::Int(v as i32),
            Scalar::Int64(_) => Scalar::Int64(v as i64),
            Scalar::Float(_) => Scalar::Float(v as f32),
        }
    }

    /// `(1 - fraction) * start + fraction * target`, in float arithmetic,
    /// stored back as `start`'s kind.
    pub fn lerp(start: Scalar, target: Scalar, fraction: f32) -> Scalar {
        let f = fraction as f64;
        start.with_f64((1.0 - f) * start.as_f64() + f * target.as_f64())
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int64(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v)
    }
}

#[derive(Debug)]
pub(crate) struct AnimatableCell {
    value: Cell<Scalar>,
    start: Cell<Scalar>,
    target: Cell<Scalar>,
}

/// An animatable property.
///
/// The owner of the property keeps the `Animatable` and reads its current
/// value when drawing. Animations only hold weak references, so dropping the
/// owner's handle silently takes the property out of any animation.
#[derive(Clone, Debug)]
pub struct Animatable {
    cell: Rc<AnimatableCell>,
}

impl Animatable {
    pub fn new(value: impl Into<Scalar>) -> Self {
        let value = value.into();
        Self {
            cell: Rc::new(AnimatableCell {
                value: Cell::new(value),
                start: Cell::new(value),
                target: Cell::new(value),
            }),
        }
    }

    pub fn kind(&self) -> ScalarKind {
        self.cell.value.get().kind()
    }

    /// Current (possibly mid-animation) value.
    pub fn get(&self) -> Scalar {
        self.cell.value.get()
    }

    pub fn get_f32(&self) -> f32 {
        self.get().as_f64() as f32
    }

    pub fn get_i32(&self) -> i32 {
        self.get().as_f64() as i32
    }

    pub fn start(&self) -> Scalar {
        self.cell.start.get()
    }

    pub fn target(&self) -> Scalar {
        self.cell.target.get()
    }

    /// Set the value immediately, without animating.
    pub fn set(&self, value: impl Into<Scalar>) {
        let value = self.coerce(value.into());
        self.cell.value.set(value);
        self.cell.start.set(value);
        self.cell.target.set(value);
    }

    /// Retarget: the next animation runs from the current value to `target`.
    pub fn set_target(&self, target: impl Into<Scalar>) {
        let target = self.coerce(target.into());
        self.cell.start.set(self.cell.value.get());
        self.cell.target.set(target);
    }

    /// Set start and target explicitly.
    pub fn set_range(&self, start: impl Into<Scalar>, target: impl Into<Scalar>) {
        self.cell.start.set(self.coerce(start.into()));
        self.cell.target.set(self.coerce(target.into()));
    }

    pub fn ptr_eq(&self, other: &Animatable) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn downgrade(&self) -> WeakAnimatable {
        WeakAnimatable { cell: Rc::downgrade(&self.cell) }
    }

    pub(crate) fn write(&self, value: Scalar) {
        self.cell.value.set(value);
    }

    pub(crate) fn restart_from_current(&self) {
        self.cell.start.set(self.cell.value.get());
    }

    // Values keep the kind they were created with.
    fn coerce(&self, v: Scalar) -> Scalar {
        self.get().with_f64(v.as_f64())
    }
}

/// Non-owning reference held by running animations.
#[derive(Clone, Debug)]
pub(crate) struct WeakAnimatable {
    cell: Weak<AnimatableCell>,
}

impl WeakAnimatable {
    pub(crate) fn upgrade(&self) -> Option<Animatable> {
        self.cell.upgrade().map(|cell| Animatable { cell })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.cell.strong_count() > 0
    }

    pub(crate) fn points_to(&self, a: &Animatable) -> bool {
        self.is_alive() && std::ptr::eq(self.cell.as_ptr(), Rc::as_ptr(&a.cell))
    }
}

static_assertions::assert_impl_all!(Scalar: Copy, Send, Sync);
static_assertions::assert_impl_all!(AnimationId: Send, Sync);
static_assertions::assert_not_impl_any!(Animatable: Send, Sync);
