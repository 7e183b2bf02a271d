//! The futurize adapter.
//!
//! User callables may return a bare value, a `Result`, or a future; the
//! [`Futurize`] trait converts all of them into a uniform [`Future`].
//! [`futurize_invoke`] additionally reifies a panic thrown by the callable
//! into an exceptional future, so every action invocation in the
//! combinators goes through it.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::Error;
use crate::types::StopIteration;

use super::{make_ready_future, Future};

/// Conversion of a callable's return value into a future.
///
/// Implemented for futures (identity), `Result<T, Error>` (ready or
/// exceptional), and the bare value types loop actions commonly produce.
/// `Option<T>` futurizes to `Future<Option<T>>`: the option itself is the
/// value, as consumed by
/// [`repeat_until_value`](crate::combinator::repeat_until_value).
pub trait Futurize: 'static {
    /// The value type of the resulting future.
    type Value: 'static;

    /// Converts `self` into a future.
    fn into_future(self) -> Future<Self::Value>;
}

impl<T: 'static> Futurize for Future<T> {
    type Value = T;

    fn into_future(self) -> Future<T> {
        self
    }
}

impl<T: 'static> Futurize for Result<T, Error> {
    type Value = T;

    fn into_future(self) -> Future<T> {
        Future::from_result(self)
    }
}

impl<T: 'static> Futurize for Option<T> {
    type Value = Option<T>;

    fn into_future(self) -> Future<Option<T>> {
        make_ready_future(self)
    }
}

macro_rules! impl_futurize_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Futurize for $ty {
                type Value = $ty;

                fn into_future(self) -> Future<$ty> {
                    make_ready_future(self)
                }
            }
        )+
    };
}

impl_futurize_value!(
    (),
    StopIteration,
    bool,
    char,
    String,
    &'static str,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
);

/// Converts an already-produced value into a future.
pub fn futurize<R: Futurize>(value: R) -> Future<R::Value> {
    value.into_future()
}

/// Invokes a callable and futurizes its outcome.
///
/// A panic thrown by the callable is caught and reified into an
/// exceptional future carrying the panic payload.
pub fn futurize_invoke<F, R>(f: F) -> Future<R::Value>
where
    F: FnOnce() -> R,
    R: Futurize,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value.into_future(),
        Err(payload) => Future::from_error(Error::from_panic(payload)),
    }
}
