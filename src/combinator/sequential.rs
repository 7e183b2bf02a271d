//! Sequential asynchronous loops.

use std::marker::PhantomData;

use crate::error::Error;
use crate::future::continuation::{set_callback, Continuation};
use crate::future::futurize::{futurize_invoke, Futurize};
use crate::future::{make_ready_future, Future, Promise};
use crate::runtime;
use crate::types::StopIteration;

use super::repeat::repeat;

/// Heap state of a suspended [`do_until`] loop.
struct DoUntilState<S, A, R> {
    promise: Promise<()>,
    stop: S,
    action: A,
    _ret: PhantomData<fn() -> R>,
}

impl<S, A, R> DoUntilState<S, A, R>
where
    S: FnMut() -> bool + 'static,
    A: FnMut() -> R + 'static,
    R: Futurize<Value = ()>,
{
    fn new(stop: S, action: A) -> Box<Self> {
        Box::new(Self {
            promise: Promise::new(),
            stop,
            action,
            _ret: PhantomData,
        })
    }

    fn run(mut self: Box<Self>) {
        loop {
            if (self.stop)() {
                self.promise.set_value(());
                return;
            }
            let f = futurize_invoke(&mut self.action);
            if !f.available() {
                set_callback(f, self);
                return;
            }
            if let Err(e) = f.get() {
                self.promise.set_exception(e);
                return;
            }
            if runtime::need_preempt() {
                runtime::schedule(move || self.complete(Ok(())));
                return;
            }
        }
    }
}

impl<S, A, R> Continuation<()> for DoUntilState<S, A, R>
where
    S: FnMut() -> bool + 'static,
    A: FnMut() -> R + 'static,
    R: Futurize<Value = ()>,
{
    fn complete(self: Box<Self>, result: Result<(), Error>) {
        match result {
            Err(e) => self.promise.set_exception(e),
            Ok(()) => self.run(),
        }
    }
}

/// Invokes `action` until it fails or `stop` evaluates to true.
///
/// `stop` is consulted *before* each invocation, never after: a final
/// `stop() == true` resolves the returned future successfully without
/// another call to `action`.
pub fn do_until<S, A, R>(mut stop: S, mut action: A) -> Future<()>
where
    S: FnMut() -> bool + 'static,
    A: FnMut() -> R + 'static,
    R: Futurize<Value = ()>,
{
    loop {
        if stop() {
            return make_ready_future(());
        }
        let f = futurize_invoke(&mut action);
        if !f.available() {
            let mut state = DoUntilState::new(stop, action);
            let out = state.promise.get_future();
            set_callback(f, state);
            return out;
        }
        if f.failed() {
            return f;
        }
        if runtime::need_preempt() {
            let mut state = DoUntilState::new(stop, action);
            let out = state.promise.get_future();
            runtime::schedule(move || state.complete(Ok(())));
            return out;
        }
    }
}

fn do_for_each_impl<It, A, R>(mut iter: It, mut action: A) -> Future<()>
where
    It: Iterator + 'static,
    A: FnMut(It::Item) -> R + 'static,
    R: Futurize<Value = ()>,
{
    loop {
        // Advance before examining completion, so the action sees every
        // element exactly once even when an invocation suspends.
        let Some(item) = iter.next() else {
            return make_ready_future(());
        };
        let f = futurize_invoke(|| action(item));
        if !f.available() || runtime::need_preempt() {
            return f.then_wrapped(move |f| match f.get() {
                Ok(()) => do_for_each_impl(iter, action),
                Err(e) => Future::from_error(e),
            });
        }
        if f.failed() {
            return f;
        }
    }
}

/// Invokes `action` on each element of `range`, waiting for the previous
/// invocation to resolve before starting the next one.
///
/// Resolves once the whole range was processed, or with the first failure.
pub fn do_for_each<I, A, R>(range: I, action: A) -> Future<()>
where
    I: IntoIterator,
    I::IntoIter: 'static,
    A: FnMut(I::Item) -> R + 'static,
    R: Futurize<Value = ()>,
{
    do_for_each_impl(range.into_iter(), action)
}

/// Invokes `action` repeatedly until it fails.
///
/// Each successful completion means "call me again"; the returned future
/// resolves with the first failure.
pub fn keep_doing<A, R>(mut action: A) -> Future<()>
where
    A: FnMut() -> R + 'static,
    R: Futurize<Value = ()>,
{
    repeat(move || futurize_invoke(&mut action).then(|()| StopIteration::No))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{later, run_until_idle};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn do_until_checks_stop_before_first_call() {
        let called = Rc::new(Cell::new(false));
        let called2 = Rc::clone(&called);
        let f = do_until(
            || true,
            move || {
                called2.set(true);
                make_ready_future(())
            },
        );
        assert!(f.available());
        assert!(f.get().is_ok());
        assert!(!called.get());
    }

    #[test]
    fn do_until_iterates_until_stop() {
        let count = Rc::new(Cell::new(0));
        let stop_count = Rc::clone(&count);
        let body_count = Rc::clone(&count);
        let f = do_until(
            move || stop_count.get() == 5,
            move || {
                body_count.set(body_count.get() + 1);
                later()
            },
        );
        run_until_idle();
        assert!(f.get().is_ok());
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn do_until_propagates_action_failure() {
        let f = do_until(|| false, || Err::<(), _>(Error::user("body failed")));
        assert!(f.failed());
        let _ = f.get();
    }

    #[test]
    fn do_for_each_visits_every_element_in_order() {
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen2 = Rc::clone(&seen);
        let f = do_for_each(0..5, move |v| {
            let seen = Rc::clone(&seen2);
            later().then(move |()| seen.borrow_mut().push(v))
        });
        run_until_idle();
        assert!(f.get().is_ok());
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn do_for_each_stops_at_first_failure() {
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen2 = Rc::clone(&seen);
        let f = do_for_each(0..5, move |v| {
            seen2.borrow_mut().push(v);
            if v == 2 {
                Err(Error::user("element 2"))
            } else {
                Ok(())
            }
        });
        run_until_idle();
        assert!(f.failed());
        let _ = f.get();
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn keep_doing_runs_until_failure() {
        let count = Rc::new(Cell::new(0));
        let count2 = Rc::clone(&count);
        let f = keep_doing(move || {
            count2.set(count2.get() + 1);
            if count2.get() == 7 {
                Err(Error::user("enough"))
            } else {
                Ok(())
            }
        });
        run_until_idle();
        assert!(f.failed());
        let _ = f.get();
        assert_eq!(count.get(), 7);
    }
}
