//! Timers over the reactor's virtual clock.
//!
//! Timers are stored in a min-heap keyed by `(deadline, registration id)`,
//! so expiry order is deterministic: earliest deadline first, registration
//! order for equal deadlines. Cancellation is O(1): the callback is
//! removed from a side table and the heap entry is discarded lazily when
//! it surfaces.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use crate::future::{Future, Promise};
use crate::tracing_compat::trace;
use crate::types::Time;

struct TimerEntry {
    deadline: Time,
    id: u64,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest deadline first, then lowest id.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) struct TimerWheel {
    heap: BinaryHeap<TimerEntry>,
    callbacks: HashMap<u64, Box<dyn FnOnce()>>,
    next_id: u64,
}

impl TimerWheel {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            callbacks: HashMap::new(),
            next_id: 0,
        }
    }

    pub(crate) fn arm(&mut self, deadline: Time, callback: Box<dyn FnOnce()>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(TimerEntry { deadline, id });
        self.callbacks.insert(id, callback);
        trace!(id, deadline = deadline.as_nanos(), "timer armed");
        id
    }

    /// Returns true iff the timer had not yet fired.
    pub(crate) fn cancel(&mut self, id: u64) -> bool {
        let prevented = self.callbacks.remove(&id).is_some();
        trace!(id, prevented, "timer cancelled");
        prevented
    }

    /// Removes and returns the callbacks of every timer due at `now`, in
    /// deterministic expiry order.
    pub(crate) fn take_due(&mut self, now: Time) -> Vec<Box<dyn FnOnce()>> {
        let mut due = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.deadline > now {
                break;
            }
            let entry = self.heap.pop().expect("peeked entry present");
            if let Some(cb) = self.callbacks.remove(&entry.id) {
                trace!(id = entry.id, "timer fired");
                due.push(cb);
            }
        }
        due
    }
}

/// A one-shot timer firing a callback on or after a deadline.
///
/// Arming hands the callback to the reactor's timer wheel; the handle is
/// then only good for [`cancel`](Timer::cancel). Dropping an armed handle
/// cancels it.
pub struct Timer {
    callback: Option<Box<dyn FnOnce()>>,
    armed: Option<u64>,
}

impl Timer {
    /// Creates an unarmed timer holding `callback`.
    pub fn new(callback: impl FnOnce() + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            armed: None,
        }
    }

    /// Arms the timer to fire at `deadline`.
    ///
    /// # Panics
    /// Panics if the timer was already armed; these timers are one-shot.
    pub fn arm(&mut self, deadline: Time) {
        let cb = self
            .callback
            .take()
            .expect("timer already armed; timers are one-shot");
        self.armed = Some(super::arm_timer(deadline, cb));
    }

    /// Arms the timer to fire after `d` from now.
    pub fn arm_after(&mut self, d: Duration) {
        self.arm(super::current_time() + d);
    }

    /// Attempts to cancel the timer.
    ///
    /// Returns true iff the timer was armed and had not yet fired, i.e.
    /// the firing was prevented.
    pub fn cancel(&mut self) -> bool {
        self.armed
            .take()
            .is_some_and(|id| super::cancel_timer(id))
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(id) = self.armed.take() {
            super::cancel_timer_quiet(id);
        }
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("armed", &self.armed)
            .finish()
    }
}

/// Returns a future resolving once the virtual clock has advanced by `d`.
pub fn sleep(d: Duration) -> Future<()> {
    let mut pr = Promise::new();
    let f = pr.get_future();
    let deadline = super::current_time() + d;
    super::arm_timer(deadline, Box::new(move || pr.set_value(())));
    f
}
