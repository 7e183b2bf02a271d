//! Asynchronous map/reduce.
//!
//! The mapper is invoked on every element up front, so mappers run in
//! parallel; folds into the shared accumulator are serialised (fold `N+1`
//! waits for fold `N`) by threading a future through the chain. After a
//! failed fold the remaining folds are bypassed, but every outstanding
//! mapper future is still awaited and its readiness observed before the
//! failure surfaces.
//!
//! Two flavours (Rust has no overloading, so they carry distinct names):
//!
//! - [`map_reduce`]: explicit fold over an initial value with a binary
//!   `reduce(acc, value) -> acc`
//! - [`map_reduce_with`]: a stateful [`Reduce`] implementation accumulates
//!   internally and produces its result, a bare value or a future, in
//!   [`Reduce::finish`]

use std::cell::RefCell;
use std::rc::Rc;

use crate::future::futurize::{futurize, futurize_invoke, Futurize};
use crate::future::{make_ready_future, now, Future};

/// A stateful reducer for [`map_reduce_with`].
pub trait Reduce<V>: 'static {
    /// Result of the reduction; a bare value or a future.
    type Output: Futurize;

    /// Folds one mapped value into the accumulator. Folds are never
    /// invoked concurrently.
    fn accumulate(&mut self, value: V) -> Future<()>;

    /// Produces the final result once every fold has completed.
    fn finish(self) -> Self::Output;
}

/// Reducer that sums mapped values into an accumulator.
#[derive(Debug, Default, Clone, Copy)]
pub struct Adder<T> {
    total: T,
}

impl<T: Default> Adder<T> {
    /// Creates an adder starting from `T::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total: T::default(),
        }
    }
}

impl<T> Reduce<T> for Adder<T>
where
    T: std::ops::AddAssign + Default + Futurize<Value = T>,
{
    type Output = T;

    fn accumulate(&mut self, value: T) -> Future<()> {
        self.total += value;
        now()
    }

    fn finish(self) -> T {
        self.total
    }
}

/// Chains one mapped future into the fold pipeline: wait for the mapped
/// value, then for the prior fold, then fold. If the pipeline has
/// already failed, the mapped result is instead observed and
/// discarded.
fn chain_fold<V: 'static>(
    prior: Future<()>,
    mapped: Future<V>,
    fold: impl FnOnce(V) -> Future<()> + 'static,
) -> Future<()> {
    mapped.then_wrapped(move |mapped| {
        prior.then_wrapped(move |prior| {
            if prior.failed() {
                mapped.ignore_ready();
                return prior;
            }
            let _ = prior.get();
            match mapped.get() {
                Ok(value) => fold(value),
                Err(e) => Future::from_error(e),
            }
        })
    })
}

/// Asynchronous map/reduce with an explicit initial value and a binary
/// reduction function.
///
/// Equivalent to `reduce(reduce(initial, mapper(x0)), mapper(x1)) …` with
/// the mappers running in parallel and the reductions serialised. The
/// first failure (a mapper error or panic, or a panicking `reduce`)
/// resolves the returned future after all mapper futures have completed.
pub fn map_reduce<I, M, R, A, F>(range: I, mut mapper: M, initial: A, reduce: F) -> Future<A>
where
    I: IntoIterator,
    M: FnMut(I::Item) -> R,
    R: Futurize,
    A: 'static,
    F: FnMut(A, R::Value) -> A + 'static,
{
    struct FoldState<A, F> {
        acc: Option<A>,
        reduce: F,
    }

    let state = Rc::new(RefCell::new(FoldState {
        acc: Some(initial),
        reduce,
    }));
    let mut ret: Future<()> = make_ready_future(());
    for item in range {
        let mapped = futurize_invoke(|| mapper(item));
        let state = Rc::clone(&state);
        ret = chain_fold(ret, mapped, move |value| {
            futurize_invoke(move || {
                let mut s = state.borrow_mut();
                let acc = s.acc.take().expect("accumulator present until the last fold");
                let next = (s.reduce)(acc, value);
                s.acc = Some(next);
            })
        });
    }
    ret.then(move |()| {
        let value = state
            .borrow_mut()
            .acc
            .take()
            .expect("accumulator present until the last fold");
        make_ready_future(value)
    })
}

/// Asynchronous map/reduce with a stateful [`Reduce`] accumulator.
///
/// The reducer is shared across the fold chain; once every fold has
/// completed, [`Reduce::finish`] produces the resolution of the returned
/// future (futurized, so it may itself be a future).
pub fn map_reduce_with<I, M, R, D>(
    range: I,
    mut mapper: M,
    reducer: D,
) -> Future<<D::Output as Futurize>::Value>
where
    I: IntoIterator,
    M: FnMut(I::Item) -> R,
    R: Futurize,
    D: Reduce<R::Value>,
{
    let reducer = Rc::new(RefCell::new(Some(reducer)));
    let mut ret: Future<()> = make_ready_future(());
    for item in range {
        let mapped = futurize_invoke(|| mapper(item));
        let reducer = Rc::clone(&reducer);
        ret = chain_fold(ret, mapped, move |value| {
            futurize_invoke(move || {
                reducer
                    .borrow_mut()
                    .as_mut()
                    .expect("reducer present until finish")
                    .accumulate(value)
            })
        });
    }
    ret.then(move |()| {
        let r = reducer
            .borrow_mut()
            .take()
            .expect("reducer present until finish");
        futurize(r.finish())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::future::ignored_failure_count;
    use crate::runtime::{later, run_until_idle};

    #[test]
    fn fold_over_ready_mappers() {
        let f = map_reduce(1..=4, |x| x * 10, 0, |acc, v| acc + v);
        run_until_idle();
        assert_eq!(f.get().ok(), Some(100));
    }

    #[test]
    fn fold_over_suspended_mappers() {
        let f = map_reduce(
            1..=4,
            |x| later().then(move |()| x * 10),
            0,
            |acc, v| acc + v,
        );
        run_until_idle();
        assert_eq!(f.get().ok(), Some(100));
    }

    #[test]
    fn mapper_failure_propagates_after_draining() {
        let before = ignored_failure_count();
        let f = map_reduce(
            0..4,
            |x| {
                if x == 1 {
                    Err(Error::user("mapper refused"))
                } else {
                    Ok(x)
                }
            },
            0,
            |acc, v| acc + v,
        );
        run_until_idle();
        assert!(f.failed());
        let _ = f.get();
        assert_eq!(ignored_failure_count(), before);
    }

    #[test]
    fn panicking_reduce_fails_the_fold() {
        let f = map_reduce(
            0..3,
            |x| x,
            0,
            |acc, v| {
                assert!(v < 2, "fold rejected {v}");
                acc + v
            },
        );
        run_until_idle();
        assert!(f.failed());
        let _ = f.get();
    }

    #[test]
    fn adder_reducer_sums() {
        let f = map_reduce_with(1..=10, |x| i64::from(x), Adder::<i64>::new());
        run_until_idle();
        assert_eq!(f.get().ok(), Some(55));
    }

    #[test]
    fn reducer_with_future_output() {
        struct Collect {
            values: Vec<u32>,
        }

        impl Reduce<u32> for Collect {
            type Output = Future<Vec<u32>>;

            fn accumulate(&mut self, value: u32) -> Future<()> {
                self.values.push(value);
                now()
            }

            fn finish(self) -> Future<Vec<u32>> {
                make_ready_future(self.values)
            }
        }

        let f = map_reduce_with(0u32..4, |x| later().then(move |()| x), Collect { values: Vec::new() });
        run_until_idle();
        assert_eq!(f.get().ok(), Some(vec![0, 1, 2, 3]));
    }

    #[test]
    fn empty_range_produces_the_initial_value() {
        let f = map_reduce(0..0, |x: i32| x, 42, |acc, v| acc + v);
        assert_eq!(f.get().ok(), Some(42));
    }
}
