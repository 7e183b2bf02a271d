//! One-shot future/promise cell.
//!
//! A [`Future`] holds either a not-yet-available slot, a ready value, or a
//! ready error. A [`Promise`] is the write end, paired with exactly one
//! future; fulfilling the promise transitions the future to ready. A future
//! accepts at most one continuation, installed through
//! [`set_callback`](continuation::set_callback) or the
//! [`then`](Future::then)/[`then_wrapped`](Future::then_wrapped) adapters.
//!
//! # Representation
//!
//! A ready future carries its result inline; no heap allocation happens
//! until a promise/future pair is split across a suspension point, at which
//! point the two ends share a reference-counted state. Everything is
//! single-threaded: state is `Rc<RefCell<..>>`, never a lock.
//!
//! # Ignored failures
//!
//! Dropping a failed future whose error was never observed is a bug in the
//! making: the failure vanishes silently. The drop path emits a
//! "exceptional future ignored" warning and bumps a thread-local counter
//! ([`ignored_failure_count`]) so tests can assert that no failure was
//! dropped on the floor. [`Future::ignore_ready`] discards a result
//! explicitly, without the diagnostic.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{Error, ErrorKind};
use crate::runtime;
use crate::tracing_compat::warn;

pub mod continuation;
pub mod futurize;

use continuation::{set_callback_fn, Continuation};
use futurize::{futurize_invoke, Futurize};

thread_local! {
    static IGNORED_FAILURES: Cell<u64> = const { Cell::new(0) };
}

/// Returns how many failed futures were dropped without their error being
/// observed on this thread.
#[must_use]
pub fn ignored_failure_count() -> u64 {
    IGNORED_FAILURES.with(Cell::get)
}

#[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
pub(crate) fn report_ignored(err: &Error) {
    // try_with: this can run from drop glue during thread teardown.
    let _ = IGNORED_FAILURES.try_with(|c| c.set(c.get() + 1));
    warn!(error = %err, "exceptional future ignored");
}

pub(crate) struct Shared<T> {
    result: Option<Result<T, Error>>,
    callback: Option<Box<dyn Continuation<T>>>,
    future_taken: bool,
    future_attached: bool,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            result: None,
            callback: None,
            future_taken: false,
            future_attached: false,
        }
    }
}

enum Inner<T> {
    Ready(Result<T, Error>),
    Pending(Rc<RefCell<Shared<T>>>),
    Gone,
}

/// The read end of a one-shot asynchronous value cell.
#[must_use = "futures resolve exactly once; dropping one discards its result"]
pub struct Future<T: 'static> {
    inner: Inner<T>,
}

impl<T: 'static> Future<T> {
    /// Creates a ready future from a result.
    pub fn from_result(result: Result<T, Error>) -> Self {
        Self {
            inner: Inner::Ready(result),
        }
    }

    /// Creates a ready failed future.
    pub fn from_error(err: Error) -> Self {
        Self::from_result(Err(err))
    }

    /// An invalid future used to fill a vector slot while its real future
    /// is being awaited. Never observed.
    pub(crate) fn placeholder() -> Self {
        Self { inner: Inner::Gone }
    }

    /// Returns true if the future has resolved (with a value or an error).
    #[must_use]
    pub fn available(&self) -> bool {
        match &self.inner {
            Inner::Ready(_) => true,
            Inner::Pending(shared) => shared.borrow().result.is_some(),
            Inner::Gone => false,
        }
    }

    /// Returns true if the future has resolved with an error.
    #[must_use]
    pub fn failed(&self) -> bool {
        match &self.inner {
            Inner::Ready(r) => r.is_err(),
            Inner::Pending(shared) => matches!(shared.borrow().result, Some(Err(_))),
            Inner::Gone => false,
        }
    }

    fn take_inner(&mut self) -> Inner<T> {
        std::mem::replace(&mut self.inner, Inner::Gone)
    }

    /// Takes the result out of a ready future.
    ///
    /// # Panics
    /// Panics if the future is not available. Combinators only call this
    /// after checking [`available`](Self::available).
    pub fn get(mut self) -> Result<T, Error> {
        match self.take_inner() {
            Inner::Ready(r) => r,
            Inner::Pending(shared) => {
                let mut s = shared.borrow_mut();
                s.future_attached = false;
                s.result
                    .take()
                    .expect("get() called on a future that is not ready")
            }
            Inner::Gone => panic!("get() called on a consumed future"),
        }
    }

    /// Explicitly discards the future's readiness.
    ///
    /// Unlike dropping the future, a failed result discarded this way does
    /// not trigger the ignored-failure diagnostic.
    pub fn ignore_ready(mut self) {
        match self.take_inner() {
            Inner::Ready(_) | Inner::Gone => {}
            Inner::Pending(shared) => {
                let mut s = shared.borrow_mut();
                s.future_attached = false;
                let _ = s.result.take();
            }
        }
    }

    /// Forwards this future's eventual result into `pr`.
    pub fn forward_to(self, pr: Promise<T>) {
        if self.available() {
            pr.resolve_with(self.get());
        } else {
            set_callback_fn(self, move |result| pr.resolve_with(result));
        }
    }

    /// Chains a continuation receiving the ready future itself, so both
    /// the value and the error path can be inspected.
    ///
    /// If this future is already available and the scheduler does not ask
    /// for preemption, `f` runs immediately; otherwise it is installed as
    /// the future's continuation and runs as a task. The return value of
    /// `f` is futurized, so it may be a bare value, a `Result`, or another
    /// future (which is flattened).
    pub fn then_wrapped<R, F>(self, f: F) -> Future<R::Value>
    where
        R: Futurize,
        F: FnOnce(Future<T>) -> R + 'static,
    {
        if self.available() && !runtime::need_preempt() {
            return futurize_invoke(move || f(self));
        }
        let mut pr = Promise::new();
        let out = pr.get_future();
        set_callback_fn(self, move |result| {
            futurize_invoke(move || f(Future::from_result(result))).forward_to(pr);
        });
        out
    }

    /// Chains a continuation receiving the value; errors bypass `f` and
    /// propagate to the returned future.
    pub fn then<R, F>(self, f: F) -> Future<R::Value>
    where
        R: Futurize,
        F: FnOnce(T) -> R + 'static,
    {
        self.then_wrapped(move |fut| match fut.get() {
            Ok(v) => futurize_invoke(move || f(v)),
            Err(e) => Future::from_error(e),
        })
    }
}

impl<T: 'static> Drop for Future<T> {
    fn drop(&mut self) {
        match self.take_inner() {
            Inner::Ready(Err(e)) => report_ignored(&e),
            Inner::Ready(Ok(_)) | Inner::Gone => {}
            Inner::Pending(shared) => {
                let mut s = shared.borrow_mut();
                s.future_attached = false;
                if let Some(Err(e)) = s.result.take() {
                    drop(s);
                    report_ignored(&e);
                }
            }
        }
    }
}

impl<T: 'static> std::fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.inner {
            Inner::Ready(Ok(_)) => "ready",
            Inner::Ready(Err(_)) => "failed",
            Inner::Pending(_) if self.available() => {
                if self.failed() {
                    "failed"
                } else {
                    "ready"
                }
            }
            Inner::Pending(_) => "pending",
            Inner::Gone => "consumed",
        };
        f.debug_struct("Future").field("state", &state).finish()
    }
}

/// The write end of a one-shot asynchronous value cell.
pub struct Promise<T: 'static> {
    shared: Option<Rc<RefCell<Shared<T>>>>,
}

impl<T: 'static> Promise<T> {
    /// Creates an unfulfilled promise.
    pub fn new() -> Self {
        Self {
            shared: Some(Rc::new(RefCell::new(Shared::new()))),
        }
    }

    /// Returns the future paired with this promise.
    ///
    /// # Panics
    /// Panics if called more than once.
    pub fn get_future(&mut self) -> Future<T> {
        let shared = self
            .shared
            .as_ref()
            .expect("get_future() called on a fulfilled promise");
        {
            let mut s = shared.borrow_mut();
            assert!(
                !s.future_taken,
                "get_future() called twice on the same promise"
            );
            s.future_taken = true;
            s.future_attached = true;
        }
        Future {
            inner: Inner::Pending(Rc::clone(shared)),
        }
    }

    /// Fulfills the promise with a value.
    pub fn set_value(self, value: T) {
        self.resolve_with(Ok(value));
    }

    /// Fulfills the promise with an error.
    pub fn set_exception(self, err: Error) {
        self.resolve_with(Err(err));
    }

    pub(crate) fn resolve_with(mut self, result: Result<T, Error>) {
        if let Some(shared) = self.shared.take() {
            fulfill(&shared, result);
        }
    }
}

impl<T: 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            let broken = {
                let s = shared.borrow();
                s.result.is_none() && (s.callback.is_some() || s.future_attached)
            };
            if broken {
                fulfill(&shared, Err(Error::new(ErrorKind::BrokenPromise)));
            }
        }
    }
}

impl<T: 'static> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("fulfilled", &self.shared.is_none())
            .finish()
    }
}

fn fulfill<T: 'static>(shared: &Rc<RefCell<Shared<T>>>, result: Result<T, Error>) {
    let mut s = shared.borrow_mut();
    if let Some(cb) = s.callback.take() {
        drop(s);
        runtime::schedule(move || cb.complete(result));
    } else if s.future_attached {
        s.result = Some(result);
    } else {
        drop(s);
        if let Err(e) = result {
            report_ignored(&e);
        }
    }
}

/// Creates a future that is ready with `value`.
pub fn make_ready_future<T: 'static>(value: T) -> Future<T> {
    Future::from_result(Ok(value))
}

/// Creates a future that is ready with an error.
pub fn make_exception_future<T: 'static>(err: Error) -> Future<T> {
    Future::from_error(err)
}

/// An immediately ready `Future<()>`.
pub fn now() -> Future<()> {
    make_ready_future(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::run_until_idle;

    #[test]
    fn ready_future_is_available() {
        let f = make_ready_future(7);
        assert!(f.available());
        assert!(!f.failed());
        assert_eq!(f.get().ok(), Some(7));
    }

    #[test]
    fn exception_future_is_failed() {
        let f: Future<i32> = make_exception_future(Error::user("nope"));
        assert!(f.available());
        assert!(f.failed());
        assert!(f.get().is_err());
    }

    #[test]
    fn promise_fulfills_future() {
        let mut pr = Promise::new();
        let f = pr.get_future();
        assert!(!f.available());
        pr.set_value(13);
        assert!(f.available());
        assert_eq!(f.get().ok(), Some(13));
    }

    #[test]
    fn then_runs_inline_on_ready_value() {
        let f = make_ready_future(2).then(|v| v * 3);
        assert_eq!(f.get().ok(), Some(6));
        run_until_idle();
    }

    #[test]
    fn then_propagates_error_without_calling_closure() {
        let f: Future<i32> = make_exception_future(Error::user("first"));
        let called = std::rc::Rc::new(Cell::new(false));
        let called2 = Rc::clone(&called);
        let out = f.then(move |v| {
            called2.set(true);
            v
        });
        run_until_idle();
        assert!(!called.get());
        assert!(out.get().is_err());
    }

    #[test]
    fn then_runs_as_task_when_pending() {
        let mut pr = Promise::new();
        let f = pr.get_future();
        let out = f.then(|v: i32| v + 1);
        assert!(!out.available());
        pr.set_value(1);
        // Delivered through the task queue, not inline.
        assert!(!out.available());
        run_until_idle();
        assert_eq!(out.get().ok(), Some(2));
    }

    #[test]
    fn then_wrapped_flattens_returned_future() {
        let f = make_ready_future(1).then_wrapped(|f| make_ready_future(f.get().unwrap() + 1));
        assert_eq!(f.get().ok(), Some(2));
    }

    #[test]
    fn forward_to_moves_result() {
        let mut pr = Promise::new();
        let out = pr.get_future();
        make_ready_future(5).forward_to(pr);
        assert_eq!(out.get().ok(), Some(5));
    }

    #[test]
    fn broken_promise_fails_the_future() {
        let mut pr: Promise<i32> = Promise::new();
        let f = pr.get_future();
        drop(pr);
        assert!(f.failed());
        assert_eq!(f.get().unwrap_err().kind(), ErrorKind::BrokenPromise);
    }

    #[test]
    fn dropping_failed_future_counts_as_ignored() {
        let before = ignored_failure_count();
        let f: Future<()> = make_exception_future(Error::user("dropped"));
        drop(f);
        assert_eq!(ignored_failure_count(), before + 1);
    }

    #[test]
    fn ignore_ready_suppresses_the_diagnostic() {
        let before = ignored_failure_count();
        let f: Future<()> = make_exception_future(Error::user("observed"));
        f.ignore_ready();
        assert_eq!(ignored_failure_count(), before);
    }

    #[test]
    fn getting_an_error_counts_as_observed() {
        let before = ignored_failure_count();
        let f: Future<()> = make_exception_future(Error::user("taken"));
        let _ = f.get();
        assert_eq!(ignored_failure_count(), before);
    }

    #[test]
    fn fulfilling_a_dropped_future_reports_the_failure() {
        let before = ignored_failure_count();
        let mut pr: Promise<()> = Promise::new();
        let f = pr.get_future();
        drop(f);
        pr.set_exception(Error::user("nobody listening"));
        assert_eq!(ignored_failure_count(), before + 1);
    }

    #[test]
    #[should_panic(expected = "not ready")]
    fn get_on_pending_future_panics() {
        let mut pr: Promise<i32> = Promise::new();
        let f = pr.get_future();
        let _ = f.get();
        drop(pr);
    }
}
