//! Asynchronous combinators.
//!
//! Higher-order operations composing futures into new futures with defined
//! completion, failure, and ordering semantics:
//!
//! - [`parallel_for_each`]: launch an action over a sequence concurrently,
//!   awaiting all completions
//! - [`repeat`] / [`repeat_until_value`]: unbounded cooperative loops
//! - [`do_until`] / [`do_for_each`] / [`keep_doing`]: sequential loops
//! - [`when_all`] / [`when_all_succeed`] (and the tuple-form
//!   [`when_all!`](macro@crate::when_all) /
//!   [`when_all_succeed!`](macro@crate::when_all_succeed) macros):
//!   barriers over multiple pending operations
//! - [`map_reduce`] / [`map_reduce_with`]: asynchronous map/reduce fold
//! - [`with_timeout`]: time-bounded awaiting of an operation
//! - [`with_scheduling_group`]: dispatch to a named execution bucket
//!
//! Every combinator resolves its returned future exactly once, observes
//! every sub-future it was handed, avoids heap allocation when all inputs
//! are immediately ready, and consults the scheduler's preemption check in
//! its unbounded loops.

pub mod map_reduce;
pub mod parallel;
pub mod repeat;
pub mod scheduling;
pub mod sequential;
pub mod timeout;
pub mod when_all;

pub use map_reduce::{map_reduce, map_reduce_with, Adder, Reduce};
pub use parallel::parallel_for_each;
pub use repeat::{repeat, repeat_until_value};
pub use scheduling::with_scheduling_group;
pub use sequential::{do_for_each, do_until, keep_doing};
pub use timeout::{
    with_timeout, with_timeout_factory, DefaultTimeoutFactory, TimedOutError,
    TimeoutExceptionFactory,
};
pub use when_all::{when_all, when_all_succeed};

#[doc(hidden)]
pub use when_all::{
    when_all1, when_all2, when_all3, when_all4, when_all5, when_all6, when_all_arg,
    when_all_succeed1, when_all_succeed2, when_all_succeed3, when_all_succeed4,
    when_all_succeed5, when_all_succeed6,
};
