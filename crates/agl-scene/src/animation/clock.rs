//! Frame clocks driving the animation runner.
//!
//! A clock reports the time of the current frame and is told when somebody
//! needs per-frame ticks. [`SystemClock`] reads the monotonic clock;
//! [`ManualClock`] is advanced explicitly and shares its state between
//! clones so a test can keep a handle after giving the clock to a runner.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of frame timestamps.
pub trait FrameClock {
    /// Time of the frame being processed, measured from the clock's epoch.
    fn frame_time(&self) -> Duration;

    /// A subscriber needs a tick for every displayed frame.
    fn begin_updating(&mut self);

    /// The last subscriber has gone away.
    fn end_updating(&mut self);
}

/// Wall clock measured from construction.
pub struct SystemClock {
    epoch: Instant,
    updating: bool,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now(), updating: false }
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }
}

impl FrameClock for SystemClock {
    fn frame_time(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn begin_updating(&mut self) {
        self.updating = true;
    }

    fn end_updating(&mut self) {
        self.updating = false;
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Cell<Duration>,
    updating: Cell<bool>,
    begin_calls: Cell<usize>,
    end_calls: Cell<usize>,
}

/// Clock whose time only moves when told to.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    state: Rc<ManualState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.state.now.set(self.state.now.get() + by);
    }

    pub fn set(&self, now: Duration) {
        self.state.now.set(now);
    }

    pub fn now(&self) -> Duration {
        self.state.now.get()
    }

    pub fn is_updating(&self) -> bool {
        self.state.updating.get()
    }

    /// `(begin_updating, end_updating)` call counts.
    pub fn update_calls(&self) -> (usize, usize) {
        (self.state.begin_calls.get(), self.state.end_calls.get())
    }
}

impl FrameClock for ManualClock {
    fn frame_time(&self) -> Duration {
        self.state.now.get()
    }

    fn begin_updating(&mut self) {
        self.state.updating.set(true);
        self.state.begin_calls.set(self.state.begin_calls.get() + 1);
    }

    fn end_updating(&mut self) {
        self.state.updating.set(false);
        self.state.end_calls.set(self.state.end_calls.get() + 1);
    }
}
