//! The single-threaded cooperative reactor.
//!
//! One reactor lives per thread. It owns a FIFO queue of group-tagged
//! tasks, a virtual clock with a timer wheel, and the preemption budget
//! consulted by the loop combinators. Nothing here is shared across
//! threads; the reactor is reached through a thread-local.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `poll_budget` | 128 |
//!
//! # Preemption
//!
//! Every task dispatched by [`run_until_idle`] starts with a fresh poll
//! budget. Each [`need_preempt`] call consumes one unit; once the budget
//! is exhausted the call reports `true` and the caller is expected to
//! enqueue its remaining work and return, bounding the latency of a
//! reactor tick.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use crate::future::{Future, Promise};
use crate::tracing_compat::{debug, trace};
use crate::types::Time;

pub mod group;
pub mod timer;

pub use group::{create_scheduling_group, current_scheduling_group, SchedulingGroup};
pub use timer::{sleep, Timer};

use timer::TimerWheel;

/// Reactor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactorConfig {
    /// Units of cooperative work a task may perform before
    /// [`need_preempt`] asks it to yield.
    pub poll_budget: u32,
}

impl ReactorConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self { poll_budget: 128 }
    }

    /// Sets the poll budget.
    #[must_use]
    pub const fn with_poll_budget(mut self, poll_budget: u32) -> Self {
        self.poll_budget = poll_budget;
        self
    }
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct Task {
    group: SchedulingGroup,
    thunk: Box<dyn FnOnce()>,
}

struct Reactor {
    queue: VecDeque<Task>,
    timers: TimerWheel,
    now: Time,
    group_names: Vec<String>,
    current_group: SchedulingGroup,
    config: ReactorConfig,
    budget_left: Cell<u32>,
}

impl Reactor {
    fn new() -> Self {
        let config = ReactorConfig::default();
        Self {
            queue: VecDeque::new(),
            timers: TimerWheel::new(),
            now: Time::ZERO,
            group_names: vec![String::from("main")],
            current_group: SchedulingGroup::default(),
            config,
            budget_left: Cell::new(config.poll_budget),
        }
    }
}

thread_local! {
    static REACTOR: RefCell<Reactor> = RefCell::new(Reactor::new());
}

/// Replaces this thread's reactor configuration and refills the current
/// poll budget accordingly.
pub fn configure(config: ReactorConfig) {
    REACTOR.with(|r| {
        let mut r = r.borrow_mut();
        r.budget_left.set(config.poll_budget);
        r.config = config;
    });
}

/// Returns true when the running task has used its quota and should yield.
///
/// Consumes one unit of the current poll budget per call.
pub fn need_preempt() -> bool {
    REACTOR.with(|r| {
        let r = r.borrow();
        let left = r.budget_left.get();
        if left == 0 {
            true
        } else {
            r.budget_left.set(left - 1);
            false
        }
    })
}

// try_with: tasks scheduled while the thread-local reactor is being torn
// down (promise drop glue, mostly) are discarded instead of panicking.
fn push_task(task: Task) {
    let _ = REACTOR.try_with(|r| r.borrow_mut().queue.push_back(task));
}

/// Enqueues a task in the currently-running scheduling group.
pub fn schedule(f: impl FnOnce() + 'static) {
    schedule_in_group(current_scheduling_group(), f);
}

/// Enqueues a task tagged with a specific scheduling group.
pub fn schedule_in_group(sg: SchedulingGroup, f: impl FnOnce() + 'static) {
    push_task(Task {
        group: sg,
        thunk: Box::new(f),
    });
}

/// Runs queued tasks until the queue is empty. Returns the number of tasks
/// executed.
pub fn run_until_idle() -> usize {
    let mut steps = 0;
    loop {
        let thunk = REACTOR.with(|r| {
            let mut r = r.borrow_mut();
            match r.queue.pop_front() {
                Some(task) => {
                    r.current_group = task.group;
                    r.budget_left.set(r.config.poll_budget);
                    Some(task.thunk)
                }
                None => None,
            }
        });
        let Some(thunk) = thunk else { break };
        thunk();
        steps += 1;
    }
    REACTOR.with(|r| r.borrow_mut().current_group = SchedulingGroup::default());
    trace!(steps, "reactor drained");
    steps
}

/// Returns the number of queued tasks.
#[must_use]
pub fn pending_tasks() -> usize {
    REACTOR.with(|r| r.borrow().queue.len())
}

/// The current instant on this thread's virtual clock.
#[must_use]
pub fn current_time() -> Time {
    REACTOR.with(|r| r.borrow().now)
}

/// Advances the virtual clock, firing due timers, and pumps the task queue
/// until idle. Returns the number of tasks executed.
pub fn advance(d: Duration) -> usize {
    REACTOR.with(|r| {
        let mut r = r.borrow_mut();
        r.now = r.now.saturating_add(d);
    });
    debug!(now = current_time().as_nanos(), "clock advanced");
    let mut steps = 0;
    loop {
        let due = REACTOR.with(|r| {
            let mut r = r.borrow_mut();
            let now = r.now;
            r.timers.take_due(now)
        });
        let fired = due.len();
        for thunk in due {
            push_task(Task {
                group: SchedulingGroup::default(),
                thunk,
            });
        }
        steps += run_until_idle();
        if fired == 0 {
            break;
        }
    }
    steps
}

/// Returns a future that is not ready but is scheduled to resolve after
/// one trip through the task queue.
pub fn later() -> Future<()> {
    let mut pr = Promise::new();
    let f = pr.get_future();
    schedule(move || pr.set_value(()));
    f
}

pub(crate) fn arm_timer(deadline: Time, callback: Box<dyn FnOnce()>) -> u64 {
    REACTOR.with(|r| r.borrow_mut().timers.arm(deadline, callback))
}

pub(crate) fn cancel_timer(id: u64) -> bool {
    REACTOR.with(|r| r.borrow_mut().timers.cancel(id))
}

/// Timer cancellation safe to call from drop glue during thread teardown.
pub(crate) fn cancel_timer_quiet(id: u64) {
    let _ = REACTOR.try_with(|r| r.borrow_mut().timers.cancel(id));
}

pub(crate) fn with_group_registry<R>(f: impl FnOnce(&mut Vec<String>) -> R) -> R {
    REACTOR.with(|r| f(&mut r.borrow_mut().group_names))
}

pub(crate) fn current_group_id() -> SchedulingGroup {
    REACTOR
        .try_with(|r| r.borrow().current_group)
        .unwrap_or_default()
}
