//! Unbounded cooperative loops.

use std::marker::PhantomData;

use crate::error::Error;
use crate::future::continuation::{set_callback, Continuation};
use crate::future::futurize::{futurize_invoke, Futurize};
use crate::future::{make_ready_future, Future, Promise};
use crate::runtime;
use crate::types::StopIteration;

/// Heap state of a suspended [`repeat`] loop.
///
/// The state doubles as the continuation installed on the action's pending
/// future: the same allocation is re-armed on each suspension, and when
/// the loop runs long enough to trip the preemption check it reschedules
/// itself seeded with [`StopIteration::No`].
struct Repeater<A, R> {
    promise: Promise<()>,
    action: A,
    _ret: PhantomData<fn() -> R>,
}

impl<A, R> Repeater<A, R>
where
    A: FnMut() -> R + 'static,
    R: Futurize<Value = StopIteration>,
{
    fn new(action: A) -> Box<Self> {
        Box::new(Self {
            promise: Promise::new(),
            action,
            _ret: PhantomData,
        })
    }

    fn run(mut self: Box<Self>) {
        loop {
            let f = futurize_invoke(&mut self.action);
            if !f.available() {
                set_callback(f, self);
                return;
            }
            match f.get() {
                Err(e) => {
                    self.promise.set_exception(e);
                    return;
                }
                Ok(StopIteration::Yes) => {
                    self.promise.set_value(());
                    return;
                }
                Ok(StopIteration::No) => {}
            }
            if runtime::need_preempt() {
                runtime::schedule(move || self.complete(Ok(StopIteration::No)));
                return;
            }
        }
    }
}

impl<A, R> Continuation<StopIteration> for Repeater<A, R>
where
    A: FnMut() -> R + 'static,
    R: Futurize<Value = StopIteration>,
{
    fn complete(self: Box<Self>, result: Result<StopIteration, Error>) {
        match result {
            Err(e) => self.promise.set_exception(e),
            Ok(StopIteration::Yes) => self.promise.set_value(()),
            Ok(StopIteration::No) => self.run(),
        }
    }
}

/// Invokes `action` until it fails or requests the iteration to stop by
/// returning [`StopIteration::Yes`].
///
/// The action may return a bare [`StopIteration`] or a
/// `Future<StopIteration>`. As long as the returned futures are immediately
/// ready the loop runs synchronously, yielding to the scheduler whenever
/// [`need_preempt`](crate::runtime::need_preempt) trips; the first pending
/// future moves the loop into a heap state that continues on wake-up.
///
/// Returns a ready future once stopped, or a failed future carrying the
/// first failure.
pub fn repeat<A, R>(mut action: A) -> Future<()>
where
    A: FnMut() -> R + 'static,
    R: Futurize<Value = StopIteration>,
{
    loop {
        // Do not build the heap state yet, in case this is a short repeat.
        let f = futurize_invoke(&mut action);
        if !f.available() {
            let mut repeater = Repeater::new(action);
            let out = repeater.promise.get_future();
            set_callback(f, repeater);
            return out;
        }
        match f.get() {
            Err(e) => return Future::from_error(e),
            Ok(StopIteration::Yes) => return make_ready_future(()),
            Ok(StopIteration::No) => {}
        }
        if runtime::need_preempt() {
            let mut repeater = Repeater::new(action);
            let out = repeater.promise.get_future();
            runtime::schedule(move || repeater.complete(Ok(StopIteration::No)));
            return out;
        }
    }
}

/// Heap state of a suspended [`repeat_until_value`] loop.
struct RepeatUntilValueState<A, R, T: 'static> {
    promise: Promise<T>,
    action: A,
    _ret: PhantomData<fn() -> R>,
}

impl<A, R, T> RepeatUntilValueState<A, R, T>
where
    A: FnMut() -> R + 'static,
    R: Futurize<Value = Option<T>>,
    T: 'static,
{
    fn new(action: A) -> Box<Self> {
        Box::new(Self {
            promise: Promise::new(),
            action,
            _ret: PhantomData,
        })
    }

    fn run(mut self: Box<Self>) {
        loop {
            let f = futurize_invoke(&mut self.action);
            if !f.available() {
                set_callback(f, self);
                return;
            }
            match f.get() {
                Err(e) => {
                    self.promise.set_exception(e);
                    return;
                }
                Ok(Some(value)) => {
                    self.promise.set_value(value);
                    return;
                }
                Ok(None) => {}
            }
            if runtime::need_preempt() {
                runtime::schedule(move || self.complete(Ok(None)));
                return;
            }
        }
    }
}

impl<A, R, T> Continuation<Option<T>> for RepeatUntilValueState<A, R, T>
where
    A: FnMut() -> R + 'static,
    R: Futurize<Value = Option<T>>,
    T: 'static,
{
    fn complete(self: Box<Self>, result: Result<Option<T>, Error>) {
        match result {
            Err(e) => self.promise.set_exception(e),
            Ok(Some(value)) => self.promise.set_value(value),
            Ok(None) => self.run(),
        }
    }
}

/// Invokes `action` until it fails or produces an engaged `Option`; the
/// contained value resolves the returned future.
///
/// Same preemption and failure semantics as [`repeat`].
pub fn repeat_until_value<A, R, T>(mut action: A) -> Future<T>
where
    A: FnMut() -> R + 'static,
    R: Futurize<Value = Option<T>>,
    T: 'static,
{
    loop {
        let f = futurize_invoke(&mut action);
        if !f.available() {
            let mut state = RepeatUntilValueState::new(action);
            let out = state.promise.get_future();
            set_callback(f, state);
            return out;
        }
        match f.get() {
            Err(e) => return Future::from_error(e),
            Ok(Some(value)) => return make_ready_future(value),
            Ok(None) => {}
        }
        if runtime::need_preempt() {
            let mut state = RepeatUntilValueState::new(action);
            let out = state.promise.get_future();
            runtime::schedule(move || state.complete(Ok(None)));
            return out;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{configure, later, run_until_idle, ReactorConfig};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn repeat_stops_on_yes() {
        let count = Rc::new(Cell::new(0));
        let count2 = Rc::clone(&count);
        let f = repeat(move || {
            count2.set(count2.get() + 1);
            StopIteration::from(count2.get() == 2)
        });
        run_until_idle();
        assert!(f.available());
        assert!(f.get().is_ok());
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn repeat_propagates_action_panic() {
        let f = repeat(|| -> StopIteration { panic!("first call") });
        assert!(f.failed());
        let err = f.get().unwrap_err();
        assert_eq!(err.context(), Some("first call"));
    }

    #[test]
    fn repeat_continues_across_suspension() {
        let count = Rc::new(Cell::new(0));
        let count2 = Rc::clone(&count);
        let f = repeat(move || {
            count2.set(count2.get() + 1);
            let stop = count2.get() == 3;
            later().then(move |()| StopIteration::from(stop))
        });
        assert!(!f.available());
        run_until_idle();
        assert!(f.available());
        assert!(f.get().is_ok());
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn repeat_yields_when_preempted() {
        configure(ReactorConfig::new().with_poll_budget(8));
        let count = Rc::new(Cell::new(0u32));
        let count2 = Rc::clone(&count);
        let f = repeat(move || {
            count2.set(count2.get() + 1);
            StopIteration::from(count2.get() == 100)
        });
        // The synchronous burst is bounded by the poll budget.
        assert!(!f.available());
        assert!(count.get() <= 9);
        let steps = run_until_idle();
        assert!(steps > 1, "loop should reschedule itself, got {steps} steps");
        assert!(f.get().is_ok());
        assert_eq!(count.get(), 100);
        configure(ReactorConfig::default());
    }

    #[test]
    fn repeat_until_value_produces_the_value() {
        let count = Rc::new(Cell::new(0));
        let count2 = Rc::clone(&count);
        let f = repeat_until_value(move || {
            count2.set(count2.get() + 1);
            if count2.get() == 4 {
                Some("done")
            } else {
                None
            }
        });
        run_until_idle();
        assert_eq!(f.get().ok(), Some("done"));
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn repeat_until_value_propagates_failure() {
        let f: Future<i32> =
            repeat_until_value(|| Err::<Option<i32>, _>(Error::user("gave up")));
        assert!(f.failed());
        let _ = f.get();
    }
}
