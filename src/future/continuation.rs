//! Continuations: callbacks registered on a future, run exactly once.
//!
//! Combinator heap states implement [`Continuation`] directly, so the same
//! allocation serves both as loop state and as the callback installed on
//! the currently-awaited sub-future. When the sub-future resolves, the
//! state box is handed back through [`Continuation::complete`] and decides
//! whether to finish, re-arm itself on another future, or reschedule.

use crate::error::Error;
use crate::runtime;

use super::{Future, Inner};

/// A callback registered on a `Future<T>`, run exactly once when the
/// future becomes ready.
pub trait Continuation<T>: 'static {
    /// Consumes the continuation with the future's result.
    fn complete(self: Box<Self>, result: Result<T, Error>);
}

struct FnContinuation<F>(F);

impl<T, F> Continuation<T> for FnContinuation<F>
where
    T: 'static,
    F: FnOnce(Result<T, Error>) + 'static,
{
    fn complete(self: Box<Self>, result: Result<T, Error>) {
        (self.0)(result);
    }
}

/// Installs `cont` as the future's one continuation.
///
/// If the future is already ready, the continuation is scheduled as a task
/// immediately; otherwise it runs as a task once the promise is fulfilled.
///
/// # Panics
/// Panics if a continuation is already installed (a future accepts exactly
/// one) or if the future was already consumed.
pub fn set_callback<T: 'static>(mut fut: Future<T>, cont: Box<dyn Continuation<T>>) {
    match fut.take_inner() {
        Inner::Ready(result) => runtime::schedule(move || cont.complete(result)),
        Inner::Pending(shared) => {
            let mut cont = Some(cont);
            let ready = {
                let mut s = shared.borrow_mut();
                match s.result.take() {
                    Some(r) => Some(r),
                    None => {
                        assert!(
                            s.callback.is_none(),
                            "a future accepts exactly one continuation"
                        );
                        s.callback = cont.take();
                        None
                    }
                }
            };
            if let (Some(result), Some(cont)) = (ready, cont) {
                runtime::schedule(move || cont.complete(result));
            }
        }
        Inner::Gone => panic!("continuation installed on a consumed future"),
    }
}

/// Convenience wrapper installing a closure as the continuation.
pub fn set_callback_fn<T, F>(fut: Future<T>, f: F)
where
    T: 'static,
    F: FnOnce(Result<T, Error>) + 'static,
{
    set_callback(fut, Box::new(FnContinuation(f)));
}
