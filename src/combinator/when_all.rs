//! Barriers awaiting multiple pending operations.
//!
//! Two families live here:
//!
//! - The iterator forms, [`when_all`] and [`when_all_succeed`], collect a
//!   sequence of homogeneous futures into a vector and resolve when every
//!   one of them has resolved.
//! - The tuple forms, the [`when_all!`](crate::when_all) and
//!   [`when_all_succeed!`](crate::when_all_succeed) macros (arity 1–6),
//!   accept heterogeneous arguments: futures, or nullary callables that
//!   are invoked exactly once in left-to-right order to produce futures.
//!
//! Resolution of the tuple forms is driven in reverse index order: the
//! last argument is awaited first, so that when operations complete in
//! submission order the remaining slots are found already ready and no
//! further continuation is installed. At most one continuation is pending
//! at any time. When every input is already ready, no internal state is
//! allocated at all.
//!
//! `when_all` never fails by itself: errors stay inside the produced
//! sub-futures. `when_all_succeed` extracts the values instead, reporting
//! one representative failure while still draining every other sub-future.

use crate::error::Error;
use crate::future::futurize::{futurize_invoke, Futurize};
use crate::future::{make_ready_future, Future};

// ---------------------------------------------------------------------------
// Argument adaptation (futures or nullary callables)
// ---------------------------------------------------------------------------

/// Marker for [`IntoWhenAllArg`] selecting the future pass-through impl.
pub enum FutureArg {}

/// Marker for [`IntoWhenAllArg`] selecting the callable impl.
pub enum FnArg {}

/// Adapts a `when_all!` argument into a future.
///
/// The marker parameter `M` lets the two impls coexist; it is inferred
/// from the argument type at the call site.
pub trait IntoWhenAllArg<M> {
    /// Value type of the adapted future.
    type Value: 'static;

    /// Performs the adaptation. Callables are invoked here, exactly once.
    fn into_when_all_future(self) -> Future<Self::Value>;
}

impl<T: 'static> IntoWhenAllArg<FutureArg> for Future<T> {
    type Value = T;

    fn into_when_all_future(self) -> Future<T> {
        self
    }
}

impl<F, R> IntoWhenAllArg<FnArg> for F
where
    F: FnOnce() -> R,
    R: Futurize,
{
    type Value = R::Value;

    fn into_when_all_future(self) -> Future<R::Value> {
        futurize_invoke(self)
    }
}

/// Adapts one `when_all!` argument. A future passes through; a nullary
/// callable is invoked (its panic reified into an exceptional future).
#[doc(hidden)]
pub fn when_all_arg<M, A: IntoWhenAllArg<M>>(arg: A) -> Future<A::Value> {
    arg.into_when_all_future()
}

// ---------------------------------------------------------------------------
// Tuple forms
// ---------------------------------------------------------------------------

/// A future that resolves, always successfully, with the ready `f`.
fn rendezvous<T: 'static>(f: Future<T>) -> Future<Future<T>> {
    if f.available() {
        make_ready_future(f)
    } else {
        f.then_wrapped(make_ready_future)
    }
}

fn drain_slot<T: 'static>(f: Future<T>, ex: &mut Option<Error>) -> Option<T> {
    if ex.is_some() {
        f.ignore_ready();
        return None;
    }
    match f.get() {
        Ok(v) => Some(v),
        Err(e) => {
            *ex = Some(e);
            None
        }
    }
}

macro_rules! gen_when_all {
    ($when_all:ident, $when_all_succeed:ident, $($T:ident $f:ident),+) => {
        /// Waits for the given futures to resolve, returning them as a
        /// tuple preserving argument positions. Never fails by itself.
        #[doc(hidden)]
        pub fn $when_all<$($T: 'static),+>($($f: Future<$T>),+) -> Future<($(Future<$T>,)+)> {
            if $($f.available())&&+ {
                return make_ready_future(($($f,)+));
            }
            gen_when_all!(@rev [$($f)+] [] [$($f)+])
        }

        /// Waits for the given futures and extracts their values; any
        /// failure produces one representative error after all inputs have
        /// been drained.
        #[doc(hidden)]
        pub fn $when_all_succeed<$($T: 'static),+>($($f: Future<$T>),+) -> Future<($($T,)+)> {
            $when_all($($f),+).then(|ready| {
                let ($($f,)+) = ready;
                let mut ex: Option<Error> = None;
                $(let $f = drain_slot($f, &mut ex);)+
                if let ($(Some($f),)+) = ($($f,)+) {
                    make_ready_future(($($f,)+))
                } else {
                    Future::from_error(
                        ex.unwrap_or_else(|| Error::user("value missing without a failure")),
                    )
                }
            })
        }
    };
    (@rev [$head:ident $($tail:ident)*] [$($rev:ident)*] [$($all:ident)+]) => {
        gen_when_all!(@rev [$($tail)*] [$head $($rev)*] [$($all)+])
    };
    (@rev [] [$($rev:ident)+] [$($all:ident)+]) => {
        gen_when_all!(@build [$($rev)+] [$($all)+])
    };
    (@build [$head:ident $($rest:ident)+] [$($all:ident)+]) => {
        rendezvous($head).then(move |$head| gen_when_all!(@build [$($rest)+] [$($all)+]))
    };
    (@build [$head:ident] [$($all:ident)+]) => {
        rendezvous($head).then(move |$head| make_ready_future(($($all,)+)))
    };
}

gen_when_all!(when_all1, when_all_succeed1, T0 f0);
gen_when_all!(when_all2, when_all_succeed2, T0 f0, T1 f1);
gen_when_all!(when_all3, when_all_succeed3, T0 f0, T1 f1, T2 f2);
gen_when_all!(when_all4, when_all_succeed4, T0 f0, T1 f1, T2 f2, T3 f3);
gen_when_all!(when_all5, when_all_succeed5, T0 f0, T1 f1, T2 f2, T3 f3, T4 f4);
gen_when_all!(when_all6, when_all_succeed6, T0 f0, T1 f1, T2 f2, T3 f3, T4 f4, T5 f5);

/// Waits for up to six heterogeneous futures to resolve, capturing
/// possible errors.
///
/// Each argument is a future, or a nullary callable invoked exactly once
/// (left to right) to produce one. Resolves with a tuple of ready futures
/// preserving argument positions, so individual values or errors can be
/// examined; it never fails by itself.
#[macro_export]
macro_rules! when_all {
    ($e0:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        $crate::combinator::when_all1(f0)
    }};
    ($e0:expr, $e1:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        $crate::combinator::when_all2(f0, f1)
    }};
    ($e0:expr, $e1:expr, $e2:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        let f2 = $crate::combinator::when_all_arg($e2);
        $crate::combinator::when_all3(f0, f1, f2)
    }};
    ($e0:expr, $e1:expr, $e2:expr, $e3:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        let f2 = $crate::combinator::when_all_arg($e2);
        let f3 = $crate::combinator::when_all_arg($e3);
        $crate::combinator::when_all4(f0, f1, f2, f3)
    }};
    ($e0:expr, $e1:expr, $e2:expr, $e3:expr, $e4:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        let f2 = $crate::combinator::when_all_arg($e2);
        let f3 = $crate::combinator::when_all_arg($e3);
        let f4 = $crate::combinator::when_all_arg($e4);
        $crate::combinator::when_all5(f0, f1, f2, f3, f4)
    }};
    ($e0:expr, $e1:expr, $e2:expr, $e3:expr, $e4:expr, $e5:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        let f2 = $crate::combinator::when_all_arg($e2);
        let f3 = $crate::combinator::when_all_arg($e3);
        let f4 = $crate::combinator::when_all_arg($e4);
        let f5 = $crate::combinator::when_all_arg($e5);
        $crate::combinator::when_all6(f0, f1, f2, f3, f4, f5)
    }};
}

/// Waits for up to six heterogeneous futures and extracts their values.
///
/// Each argument is a future, or a nullary callable invoked exactly once
/// (left to right) to produce one. Resolves with the tuple of values in
/// argument order (`()` for void futures); if any input fails, resolves
/// with one representative error, after every input has completed and
/// been drained, so no failure is dropped silently.
#[macro_export]
macro_rules! when_all_succeed {
    ($e0:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        $crate::combinator::when_all_succeed1(f0)
    }};
    ($e0:expr, $e1:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        $crate::combinator::when_all_succeed2(f0, f1)
    }};
    ($e0:expr, $e1:expr, $e2:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        let f2 = $crate::combinator::when_all_arg($e2);
        $crate::combinator::when_all_succeed3(f0, f1, f2)
    }};
    ($e0:expr, $e1:expr, $e2:expr, $e3:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        let f2 = $crate::combinator::when_all_arg($e2);
        let f3 = $crate::combinator::when_all_arg($e3);
        $crate::combinator::when_all_succeed4(f0, f1, f2, f3)
    }};
    ($e0:expr, $e1:expr, $e2:expr, $e3:expr, $e4:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        let f2 = $crate::combinator::when_all_arg($e2);
        let f3 = $crate::combinator::when_all_arg($e3);
        let f4 = $crate::combinator::when_all_arg($e4);
        $crate::combinator::when_all_succeed5(f0, f1, f2, f3, f4)
    }};
    ($e0:expr, $e1:expr, $e2:expr, $e3:expr, $e4:expr, $e5:expr $(,)?) => {{
        let f0 = $crate::combinator::when_all_arg($e0);
        let f1 = $crate::combinator::when_all_arg($e1);
        let f2 = $crate::combinator::when_all_arg($e2);
        let f3 = $crate::combinator::when_all_arg($e3);
        let f4 = $crate::combinator::when_all_arg($e4);
        let f5 = $crate::combinator::when_all_arg($e5);
        $crate::combinator::when_all_succeed6(f0, f1, f2, f3, f4, f5)
    }};
}

// ---------------------------------------------------------------------------
// Iterator forms
// ---------------------------------------------------------------------------

/// Terminal transform applied once every slot of the vector is ready.
trait ResolvedVectorTransform<T: 'static>: 'static {
    type Output: 'static;

    fn run(futures: Vec<Future<T>>) -> Future<Self::Output>;
}

/// Identity transform: hand back the whole vector of ready futures.
struct IdentityFutures;

impl<T: 'static> ResolvedVectorTransform<T> for IdentityFutures {
    type Output = Vec<Future<T>>;

    fn run(futures: Vec<Future<T>>) -> Future<Vec<Future<T>>> {
        make_ready_future(futures)
    }
}

/// Value-extracting transform: report the first failure, drain the rest.
struct ExtractValues;

impl<T: 'static> ResolvedVectorTransform<T> for ExtractValues {
    type Output = Vec<T>;

    fn run(futures: Vec<Future<T>>) -> Future<Vec<T>> {
        let mut values = Vec::with_capacity(futures.len());
        let mut ex: Option<Error> = None;
        for f in futures {
            if let Some(v) = drain_slot(f, &mut ex) {
                values.push(v);
            }
        }
        match ex {
            Some(e) => Future::from_error(e),
            None => make_ready_future(values),
        }
    }
}

fn complete_when_all<X, T>(mut futures: Vec<Future<T>>, mut pos: usize) -> Future<X::Output>
where
    X: ResolvedVectorTransform<T>,
    T: 'static,
{
    // Skip slots that are already ready.
    while pos < futures.len() && futures[pos].available() {
        pos += 1;
    }
    if pos == futures.len() {
        return X::run(futures);
    }
    // Await the unready slot, store the resolved future back, continue.
    let waiting = std::mem::replace(&mut futures[pos], Future::placeholder());
    waiting.then_wrapped(move |resolved| {
        futures[pos] = resolved;
        complete_when_all::<X, T>(futures, pos + 1)
    })
}

fn do_when_all<X, I, T>(futures: I) -> Future<X::Output>
where
    X: ResolvedVectorTransform<T>,
    I: IntoIterator<Item = Future<T>>,
    T: 'static,
{
    let iter = futures.into_iter();
    let mut collected = Vec::with_capacity(iter.size_hint().0);
    collected.extend(iter);
    complete_when_all::<X, T>(collected, 0)
}

/// Waits for a sequence of homogeneous futures to resolve, capturing
/// possible errors.
///
/// Resolves with the vector of ready futures, preserving input order, so
/// individual values or errors can be examined. Never fails by itself.
pub fn when_all<I, T>(futures: I) -> Future<Vec<Future<T>>>
where
    I: IntoIterator<Item = Future<T>>,
    T: 'static,
{
    do_when_all::<IdentityFutures, I, T>(futures)
}

/// Waits for a sequence of homogeneous futures and extracts their values.
///
/// Resolves with the values in input order; if any input failed, resolves
/// with one representative error after draining every input.
pub fn when_all_succeed<I, T>(futures: I) -> Future<Vec<T>>
where
    I: IntoIterator<Item = Future<T>>,
    T: 'static,
{
    do_when_all::<ExtractValues, I, T>(futures)
}
