//! The list of in-flight animations and the per-frame update.
//!
//! The [`AnimationRunner`] owns every animation from creation until it
//! finishes. It handles:
//! - Membership: an animatable belongs to at most one animation, adding it
//!   to another one steals it and restarts it from its current value
//! - Ticking: interpolating every member from the frame clock's time
//! - Completion: firing `on_finish` exactly once when an animation ends or
//!   loses its last member
//!
//! # Usage
//!
//! ```ignore
//! let clock = ManualClock::new();
//! let mut runner = AnimationRunner::new(clock.clone());
//!
//! let width = Animatable::new(0);
//! width.set_target(100);
//! let id = runner.new_animation(None);
//! runner.set_length(id, Duration::from_millis(100));
//! runner.add_member(id, &[width.clone()]);
//! runner.start(id);
//!
//! clock.advance(Duration::from_millis(50));
//! runner.tick();
//! assert_eq!(width.get_i32(), 50);
//! ```

use std::time::Duration;

use agl_config::AnimationConfig;

use super::clock::FrameClock;
use super::easing::EasingFunction;
use super::types::{Animatable, AnimationId, Scalar, ScalarKind, WeakAnimatable};

/// Called once when an animation ends, is removed or loses its last member.
pub type FinishCallback = Box<dyn FnOnce(AnimationId)>;

/// Called after every frame's values have been written.
pub type FrameCallback = Box<dyn FnMut(AnimationId)>;

/// Default animation length.
pub const DEFAULT_LENGTH: Duration = Duration::from_millis(300);

/// Default frame interval used for previews.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(1000 / 60);

struct Animation {
    id: AnimationId,
    length: Duration,
    /// `(start, end)` once started.
    window: Option<(Duration, Duration)>,
    easing: [EasingFunction; 3],
    /// Groups of animatables changing together.
    members: Vec<Vec<WeakAnimatable>>,
    on_frame: Option<FrameCallback>,
    on_finish: Option<FinishCallback>,
}

impl Animation {
    fn new(id: AnimationId, length: Duration, on_finish: Option<FinishCallback>) -> Self {
        Self {
            id,
            length,
            window: None,
            easing: [EasingFunction::Linear; 3],
            members: Vec::new(),
            on_frame: None,
            on_finish,
        }
    }

    /// Drop members whose owner has gone away, and groups left empty.
    fn prune(&mut self) {
        for group in &mut self.members {
            group.retain(WeakAnimatable::is_alive);
        }
        self.members.retain(|g| !g.is_empty());
    }

    fn remove(&mut self, a: &Animatable) -> bool {
        let mut found = false;
        for group in &mut self.members {
            let before = group.len();
            group.retain(|w| !w.points_to(a));
            found |= group.len() != before;
        }
        self.members.retain(|g| !g.is_empty());
        found
    }

    fn contains(&self, a: &Animatable) -> bool {
        self.members.iter().flatten().any(|w| w.points_to(a))
    }

    fn live(&self) -> impl Iterator<Item = Animatable> + '_ {
        self.members.iter().flatten().filter_map(WeakAnimatable::upgrade)
    }

    fn sample(&self, a: &Animatable, fraction: f32) -> Scalar {
        let eased = self.easing[a.kind().index()].evaluate(fraction);
        Scalar::lerp(a.start(), a.target(), eased)
    }
}

fn progress(start: Duration, end: Duration, now: Duration) -> f32 {
    if end <= start {
        return 1.0;
    }
    let elapsed = now.saturating_sub(start).as_secs_f64();
    (elapsed / (end - start).as_secs_f64()).clamp(0.0, 1.0) as f32
}

/// Ids touched by one [`AnimationRunner::tick`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Animations whose values were written this frame, in running-list order.
    pub framed: Vec<AnimationId>,
    /// Animations that finished this frame.
    pub finished: Vec<AnimationId>,
}

/// Owner of the running-animation list.
pub struct AnimationRunner {
    animations: Vec<Animation>,
    clock: Box<dyn FrameClock>,
    default_length: Duration,
    frame_interval: Duration,
    next_id: u64,
    updating: bool,
    finished: Vec<AnimationId>,
}

impl AnimationRunner {
    pub fn new(clock: impl FrameClock + 'static) -> Self {
        Self {
            animations: Vec::new(),
            clock: Box::new(clock),
            default_length: DEFAULT_LENGTH,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            next_id: 1,
            updating: false,
            finished: Vec::new(),
        }
    }

    /// Runner taking its default length and frame interval from `config`.
    pub fn with_config(config: &AnimationConfig, clock: impl FrameClock + 'static) -> Self {
        let mut runner = Self::new(clock);
        runner.default_length = Duration::from_millis(config.duration_ms as u64);
        runner.frame_interval = Duration::from_millis(config.frame_interval_ms.max(1) as u64);
        runner
    }

    pub fn default_length(&self) -> Duration {
        self.default_length
    }

    pub fn set_default_length(&mut self, length: Duration) {
        self.default_length = length;
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn now(&self) -> Duration {
        self.clock.frame_time()
    }

    /// Register a new, not yet started animation with the default length and
    /// linear easing for every kind.
    pub fn new_animation(&mut self, on_finish: Option<FinishCallback>) -> AnimationId {
        let id = AnimationId(self.next_id);
        self.next_id += 1;
        self.animations.push(Animation::new(id, self.default_length, on_finish));
        log::debug!("{id} created");
        id
    }

    pub fn set_length(&mut self, id: AnimationId, length: Duration) {
        if let Some(anim) = self.lookup(id, "set_length") {
            anim.length = length;
        }
    }

    pub fn set_easing(&mut self, id: AnimationId, kind: ScalarKind, easing: EasingFunction) {
        if let Some(anim) = self.lookup(id, "set_easing") {
            anim.easing[kind.index()] = easing;
        }
    }

    pub fn set_on_frame(&mut self, id: AnimationId, on_frame: impl FnMut(AnimationId) + 'static) {
        if let Some(anim) = self.lookup(id, "set_on_frame") {
            anim.on_frame = Some(Box::new(on_frame));
        }
    }

    pub fn set_on_finish(&mut self, id: AnimationId, on_finish: impl FnOnce(AnimationId) + 'static) {
        if let Some(anim) = self.lookup(id, "set_on_finish") {
            anim.on_finish = Some(Box::new(on_finish));
        }
    }

    /// Add a group of animatables that change together.
    ///
    /// Each one is first taken out of whatever animation currently holds it
    /// and restarted from its current value. An animation emptied this way
    /// finishes immediately.
    ///
    /// # Panics
    /// Panics if `animatables` is empty.
    pub fn add_member(&mut self, id: AnimationId, animatables: &[Animatable]) {
        assert!(!animatables.is_empty(), "add_member needs at least one animatable");
        if self.position(id).is_none() {
            log::warn!("add_member on unknown {id}");
            return;
        }
        for a in animatables {
            self.steal(a, id);
        }
        if let Some(anim) = self.lookup(id, "add_member") {
            anim.members.push(animatables.iter().map(Animatable::downgrade).collect());
        }
    }

    fn steal(&mut self, a: &Animatable, new_owner: AnimationId) {
        let mut emptied = Vec::new();
        for anim in &mut self.animations {
            if anim.remove(a) {
                a.restart_from_current();
                log::debug!("{new_owner} takes an animatable from {}", anim.id);
                if anim.id != new_owner && anim.members.is_empty() {
                    emptied.push(anim.id);
                }
            }
        }
        for id in emptied {
            self.finish(id);
        }
    }

    /// Stamp the start and end times. An animation without members is
    /// discarded without calling `on_finish`; returns whether it started.
    pub fn start(&mut self, id: AnimationId) -> bool {
        let now = self.clock.frame_time();
        let Some(anim) = self.lookup(id, "start") else {
            return false;
        };
        anim.prune();
        if anim.members.is_empty() {
            log::debug!("{id} has nothing to animate, discarding");
            self.take(id);
            return false;
        }
        anim.window = Some((now, now + anim.length));
        self.sync_updating();
        true
    }

    /// Advance every started animation to the clock's current time.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.frame_time();
        let mut report = TickReport::default();
        let mut done = Vec::new();

        for anim in &mut self.animations {
            let Some((start, end)) = anim.window else {
                continue;
            };
            anim.prune();
            if anim.members.is_empty() {
                done.push(anim.id);
                continue;
            }
            let fraction = progress(start, end, now);
            for a in anim.live() {
                a.write(anim.sample(&a, fraction));
            }
            if let Some(on_frame) = anim.on_frame.as_mut() {
                on_frame(anim.id);
            }
            report.framed.push(anim.id);
            if now > end {
                done.push(anim.id);
            }
        }

        for id in done {
            if self.finish(id) {
                report.finished.push(id);
            }
        }
        report
    }

    /// Remove an animation, firing its `on_finish`.
    pub fn remove(&mut self, id: AnimationId) -> bool {
        if self.position(id).is_none() {
            log::warn!("remove of unknown {id}");
            return false;
        }
        self.finish(id)
    }

    /// Take one animatable out of an animation. Removing the last one
    /// finishes the animation.
    pub fn remove_animatable(&mut self, id: AnimationId, a: &Animatable) -> bool {
        let Some(idx) = self.position(id) else {
            log::warn!("remove_animatable: {id} is not in the running list");
            return false;
        };
        let anim = &mut self.animations[idx];
        if !anim.remove(a) {
            log::warn!("remove_animatable: animatable is not a member of {id}");
            return false;
        }
        if anim.members.is_empty() {
            self.finish(id);
        }
        true
    }

    /// Sample a not yet started animation at every frame interval from 0 up
    /// to its length, plus a last sample clamped to the length. `f` receives
    /// the sample time and the member values in insertion order. Members are
    /// reset to their start values afterwards. Returns the number of samples.
    pub fn preview(&mut self, id: AnimationId, mut f: impl FnMut(Duration, &[Scalar])) -> usize {
        let interval = self.frame_interval.max(Duration::from_millis(1));
        let Some(idx) = self.position(id) else {
            log::warn!("preview of unknown {id}");
            return 0;
        };
        let anim = &self.animations[idx];
        if anim.window.is_some() {
            log::warn!("preview of {id} after it started");
            return 0;
        }

        let live: Vec<Animatable> = anim.live().collect();
        let mut values = Vec::with_capacity(live.len());
        let mut samples = 0;
        let mut t = Duration::ZERO;
        loop {
            let at = t.min(anim.length);
            let fraction = progress(Duration::ZERO, anim.length, at);
            values.clear();
            for a in &live {
                let v = anim.sample(a, fraction);
                a.write(v);
                values.push(v);
            }
            f(at, &values);
            samples += 1;
            if t >= anim.length {
                break;
            }
            t += interval;
        }

        for a in &live {
            a.write(a.start());
        }
        samples
    }

    /// Whether `id` is still in the running list, started or not.
    pub fn is_running(&self, id: AnimationId) -> bool {
        self.position(id).is_some()
    }

    pub fn is_started(&self, id: AnimationId) -> bool {
        self.position(id)
            .is_some_and(|i| self.animations[i].window.is_some())
    }

    /// Number of live animatables in `id`.
    pub fn member_count(&self, id: AnimationId) -> usize {
        self.position(id)
            .map_or(0, |i| self.animations[i].live().count())
    }

    /// The animation currently holding `a`.
    pub fn owner_of(&self, a: &Animatable) -> Option<AnimationId> {
        self.animations.iter().find(|anim| anim.contains(a)).map(|anim| anim.id)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Ids finished since the last call, in completion order.
    pub fn drain_finished(&mut self) -> Vec<AnimationId> {
        std::mem::take(&mut self.finished)
    }

    fn position(&self, id: AnimationId) -> Option<usize> {
        self.animations.iter().position(|a| a.id == id)
    }

    fn lookup(&mut self, id: AnimationId, op: &str) -> Option<&mut Animation> {
        let found = self.animations.iter_mut().find(|a| a.id == id);
        if found.is_none() {
            log::warn!("{op} on unknown {id}");
        }
        found
    }

    fn take(&mut self, id: AnimationId) -> Option<Animation> {
        let idx = self.position(id)?;
        let anim = self.animations.remove(idx);
        self.sync_updating();
        Some(anim)
    }

    fn finish(&mut self, id: AnimationId) -> bool {
        let Some(mut anim) = self.take(id) else {
            return false;
        };
        log::debug!("{id} finished");
        self.finished.push(id);
        if let Some(on_finish) = anim.on_finish.take() {
            on_finish(id);
        }
        true
    }

    fn sync_updating(&mut self) {
        let wanted = self.animations.iter().any(|a| a.window.is_some());
        if wanted && !self.updating {
            self.clock.begin_updating();
        } else if !wanted && self.updating {
            self.clock.end_updating();
        }
        self.updating = wanted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clock::ManualClock;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn counter() -> (Rc<Cell<usize>>, FinishCallback) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, Box::new(move |_| c.set(c.get() + 1)))
    }

    fn runner() -> (ManualClock, AnimationRunner) {
        let clock = ManualClock::new();
        (clock.clone(), AnimationRunner::new(clock))
    }

    #[test]
    fn test_boundaries_and_midpoint() {
        let (clock, mut runner) = runner();
        clock.set(ms(1000));
        let a = Animatable::new(0);
        a.set_target(100);
        let id = runner.new_animation(None);
        runner.set_length(id, ms(100));
        runner.add_member(id, &[a.clone()]);
        assert!(runner.start(id));

        runner.tick();
        assert_eq!(a.get(), Scalar::Int(0));

        clock.advance(ms(50));
        runner.tick();
        assert_eq!(a.get(), Scalar::Int(50));

        clock.advance(ms(50));
        runner.tick();
        assert_eq!(a.get(), Scalar::Int(100));
        // Removal needs now > end.
        assert!(runner.is_running(id));

        clock.advance(ms(1));
        let report = runner.tick();
        assert_eq!(report.finished, vec![id]);
        assert_eq!(a.get(), Scalar::Int(100));
        assert!(!runner.is_running(id));
    }

    #[test]
    fn test_on_finish_fires_once() {
        let (clock, mut runner) = runner();
        let (count, cb) = counter();
        let a = Animatable::new(0.0f32);
        a.set_target(1.0f32);
        let id = runner.new_animation(Some(cb));
        runner.set_length(id, ms(100));
        runner.add_member(id, &[a]);
        runner.start(id);
        for _ in 0..20 {
            clock.advance(ms(16));
            runner.tick();
        }
        assert_eq!(count.get(), 1);
        assert!(runner.is_empty());
        assert_eq!(runner.drain_finished(), vec![id]);
    }

    #[test]
    fn test_steal_restarts_from_current_value() {
        let (clock, mut runner) = runner();
        let (count, cb) = counter();
        let a = Animatable::new(0);
        a.set_target(100);
        let first = runner.new_animation(Some(cb));
        runner.set_length(first, ms(100));
        runner.add_member(first, &[a.clone()]);
        runner.start(first);

        clock.advance(ms(40));
        runner.tick();
        assert_eq!(a.get(), Scalar::Int(40));

        a.set_range(0, 0);
        let second = runner.new_animation(None);
        runner.add_member(second, &[a.clone()]);
        assert_eq!(a.start(), Scalar::Int(40), "no jump when retargeting");
        assert_eq!(runner.owner_of(&a), Some(second));

        // `first` lost its only member.
        assert!(!runner.is_running(first));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_steal_keeps_other_members() {
        let (_clock, mut runner) = runner();
        let (count, cb) = counter();
        let a = Animatable::new(0);
        let b = Animatable::new(0);
        let first = runner.new_animation(Some(cb));
        runner.add_member(first, &[a.clone(), b.clone()]);
        let second = runner.new_animation(None);
        runner.add_member(second, &[a.clone()]);

        assert!(runner.is_running(first));
        assert_eq!(runner.member_count(first), 1);
        assert_eq!(runner.owner_of(&b), Some(first));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_start_without_members_discards_silently() {
        let (clock, mut runner) = runner();
        let (count, cb) = counter();
        let id = runner.new_animation(Some(cb));
        {
            let a = Animatable::new(1);
            runner.add_member(id, &[a]);
        }
        assert!(!runner.start(id));
        assert!(!runner.is_running(id));
        assert_eq!(count.get(), 0);
        assert!(!clock.is_updating());
    }

    #[test]
    #[should_panic(expected = "add_member needs at least one animatable")]
    fn test_add_member_rejects_empty_list() {
        let (_clock, mut runner) = runner();
        let id = runner.new_animation(None);
        runner.add_member(id, &[]);
    }

    #[test]
    fn test_remove_animatable_unknown_animation_is_noop() {
        let (_clock, mut runner) = runner();
        let a = Animatable::new(1);
        let id = runner.new_animation(None);
        runner.add_member(id, &[a.clone()]);
        assert!(!runner.remove_animatable(AnimationId(999), &a));
        assert_eq!(runner.owner_of(&a), Some(id));
    }

    #[test]
    fn test_remove_last_animatable_finishes() {
        let (_clock, mut runner) = runner();
        let (count, cb) = counter();
        let a = Animatable::new(1);
        let id = runner.new_animation(Some(cb));
        runner.add_member(id, &[a.clone()]);
        assert!(runner.remove_animatable(id, &a));
        assert!(!runner.is_running(id));
        assert_eq!(count.get(), 1);
        assert!(!runner.remove_animatable(id, &a));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_on_frame_after_values_written() {
        let (clock, mut runner) = runner();
        let a = Animatable::new(0);
        a.set_target(10);
        let seen = Rc::new(Cell::new(-1));
        let id = runner.new_animation(None);
        runner.set_length(id, ms(10));
        runner.add_member(id, &[a.clone()]);
        let (probe, s) = (a.clone(), seen.clone());
        runner.set_on_frame(id, move |_| s.set(probe.get_i32()));
        runner.start(id);
        clock.advance(ms(10));
        runner.tick();
        assert_eq!(seen.get(), 10);
    }

    #[test]
    fn test_clock_updating_follows_started_animations() {
        let (clock, mut runner) = runner();
        let a = Animatable::new(0);
        let id = runner.new_animation(None);
        runner.set_length(id, ms(10));
        runner.add_member(id, &[a]);
        assert!(!clock.is_updating());
        runner.start(id);
        assert!(clock.is_updating());
        clock.advance(ms(11));
        runner.tick();
        assert!(!clock.is_updating());
        assert_eq!(clock.update_calls(), (1, 1));
    }

    #[test]
    fn test_dropped_property_finishes_animation() {
        let (clock, mut runner) = runner();
        let (count, cb) = counter();
        let a = Animatable::new(0);
        let id = runner.new_animation(Some(cb));
        runner.add_member(id, &[a.clone()]);
        runner.start(id);
        drop(a);
        clock.advance(ms(1));
        let report = runner.tick();
        assert!(report.framed.is_empty());
        assert_eq!(report.finished, vec![id]);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_preview_samples_and_resets() {
        let (_clock, mut runner) = runner();
        let a = Animatable::new(0);
        a.set_target(100);
        let id = runner.new_animation(None);
        runner.set_length(id, ms(100));
        runner.add_member(id, &[a.clone()]);

        let mut trace = Vec::new();
        let n = runner.preview(id, |t, values| trace.push((t, values[0])));
        // 0, 16, ... 96 then the clamped 100.
        assert_eq!(n, 8);
        assert_eq!(trace.first(), Some(&(ms(0), Scalar::Int(0))));
        assert_eq!(trace.last(), Some(&(ms(100), Scalar::Int(100))));
        assert_eq!(trace[1].0, ms(16));
        assert!(trace.windows(2).all(|w| w[0].1.as_f64() <= w[1].1.as_f64()));
        assert_eq!(a.get(), Scalar::Int(0));
        assert!(!runner.is_started(id));
    }

    #[test]
    fn test_easing_per_kind() {
        let (clock, mut runner) = runner();
        let i = Animatable::new(0);
        let f = Animatable::new(0.0f32);
        i.set_target(100);
        f.set_target(100.0f32);
        let id = runner.new_animation(None);
        runner.set_length(id, ms(100));
        runner.set_easing(id, ScalarKind::Float, EasingFunction::EaseIn);
        runner.add_member(id, &[i.clone(), f.clone()]);
        runner.start(id);
        clock.advance(ms(50));
        runner.tick();
        assert_eq!(i.get(), Scalar::Int(50));
        assert!(f.get_f32() < 50.0);
    }

    #[test]
    fn test_with_config() {
        let config = AnimationConfig { enabled: true, duration_ms: 120, frame_interval_ms: 40 };
        let runner = AnimationRunner::with_config(&config, ManualClock::new());
        assert_eq!(runner.default_length(), ms(120));
        assert_eq!(runner.frame_interval(), ms(40));
    }
}
