//! A clamped integer with change subscribers.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Rc<RefCell<Box<dyn FnMut(i32)>>>;

struct Inner {
    value: i32,
    min: i32,
    max: i32,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
}

/// Shared integer value clamped to `[min, max]`.
///
/// Clones refer to the same value. Subscribers are called after the value
/// changes, in subscription order.
#[derive(Clone)]
pub struct Observable {
    inner: Rc<RefCell<Inner>>,
}

impl Observable {
    pub fn new(value: i32, min: i32, max: i32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value: value.clamp(min, max),
                min,
                max,
                next_id: 1,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> i32 {
        self.inner.borrow().value
    }

    pub fn min(&self) -> i32 {
        self.inner.borrow().min
    }

    pub fn max(&self) -> i32 {
        self.inner.borrow().max
    }

    /// Store `value` clamped to the range. Returns whether it changed;
    /// subscribers only hear about changes.
    pub fn set(&self, value: i32) -> bool {
        let (value, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            let value = value.clamp(inner.min, inner.max);
            if value == inner.value {
                return false;
            }
            inner.value = value;
            let subscribers: Vec<Subscriber> =
                inner.subscribers.iter().map(|(_, s)| s.clone()).collect();
            (value, subscribers)
        };
        for subscriber in subscribers {
            match subscriber.try_borrow_mut() {
                Ok(mut f) => f(value),
                Err(_) => log::warn!("observable changed from inside its own subscriber"),
            }
        }
        true
    }

    pub fn subscribe(&self, f: impl FnMut(i32) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, Rc::new(RefCell::new(Box::new(f)))));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl std::fmt::Debug for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("min", &inner.min)
            .field("max", &inner.max)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}
