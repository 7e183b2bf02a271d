//! Time-bounded awaiting of a future.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, ErrorKind};
use crate::future::continuation::set_callback_fn;
use crate::future::{Future, Promise};
use crate::runtime::Timer;
use crate::types::Time;

/// The error produced by the default timeout exception factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timedout")]
pub struct TimedOutError;

/// Produces the error a timed-out wait resolves with.
///
/// Supply your own factory through [`with_timeout_factory`] to substitute
/// any error for the default [`TimedOutError`].
pub trait TimeoutExceptionFactory {
    /// Builds the timeout error.
    fn timeout() -> Error;
}

/// The default factory, producing [`TimedOutError`].
#[derive(Debug, Clone, Copy)]
pub struct DefaultTimeoutFactory;

impl TimeoutExceptionFactory for DefaultTimeoutFactory {
    fn timeout() -> Error {
        Error::new(ErrorKind::TimedOut).with_source(TimedOutError)
    }
}

/// Waits for either a future or a deadline, whichever comes first.
///
/// When the deadline is reached first, the returned future fails with
/// [`TimedOutError`]. Timing out does **not** cancel the inner operation:
/// it keeps running in the background and its eventual readiness is
/// observed and discarded.
pub fn with_timeout<T: 'static>(deadline: Time, f: Future<T>) -> Future<T> {
    with_timeout_factory::<DefaultTimeoutFactory, T>(deadline, f)
}

/// [`with_timeout`] with a custom [`TimeoutExceptionFactory`].
pub fn with_timeout_factory<E, T>(deadline: Time, f: Future<T>) -> Future<T>
where
    E: TimeoutExceptionFactory + 'static,
    T: 'static,
{
    if f.available() {
        return f;
    }
    let mut pr = Promise::new();
    let result = pr.get_future();
    // The output promise is co-owned by the timer callback and the input's
    // continuation; whichever fires first takes it, and Timer::cancel
    // arbitrates the race.
    let slot = Rc::new(RefCell::new(Some(pr)));
    let timer_slot = Rc::clone(&slot);
    let mut timer = Timer::new(move || {
        if let Some(pr) = timer_slot.borrow_mut().take() {
            pr.set_exception(E::timeout());
        }
    });
    timer.arm(deadline);
    set_callback_fn(f, move |res| {
        let mut timer = timer;
        if timer.cancel() {
            if let Some(pr) = slot.borrow_mut().take() {
                pr.resolve_with(res);
            }
        }
        // Timer already fired: the input's readiness is observed here and
        // discarded.
    });
    result
}
