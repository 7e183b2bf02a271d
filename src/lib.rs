//! Conflux: asynchronous combinators over a thread-per-core reactor.
//!
//! # Overview
//!
//! Conflux composes individually-asynchronous operations into coordinated
//! higher-order operations with well-defined completion, failure, and
//! ordering semantics, atop a single-threaded cooperative runtime. The
//! future here is not a polled state machine but a one-shot value cell
//! with exactly one continuation. The combinators are small explicit
//! state machines driven by those continuations.
//!
//! # Core Guarantees
//!
//! - **One resolution**: a combinator's returned future becomes ready
//!   exactly once
//! - **Nothing dropped silently**: every sub-future is consumed or
//!   explicitly ignored; an unobserved failure trips a diagnostic
//! - **Ready fast path**: no combinator allocates internal state when all
//!   of its inputs are immediately ready
//! - **Bounded ticks**: every unbounded synchronous loop honours the
//!   scheduler's preemption check at least once per iteration
//! - **Detach-only timeouts**: [`with_timeout`] gives up waiting; it never
//!   cancels the inner operation
//!
//! # Module Structure
//!
//! - [`future`]: the future/promise cell, continuations, and the futurize
//!   adapter
//! - [`combinator`]: `parallel_for_each`, the `repeat` family, sequential
//!   loops, `when_all`, `map_reduce`, `with_timeout`,
//!   `with_scheduling_group`
//! - [`runtime`]: the cooperative reactor (task queue, scheduling groups,
//!   virtual clock, timers, preemption budget)
//! - [`types`]: `Time` and the `StopIteration` sentinel
//! - [`error`]: the error value carried by exceptional futures
//!
//! # Example
//!
//! ```
//! use conflux::{parallel_for_each, runtime};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let sum = Rc::new(Cell::new(0));
//! let s = Rc::clone(&sum);
//! let done = parallel_for_each(1..=5, move |v| {
//!     s.set(s.get() + v);
//!     conflux::now()
//! });
//! runtime::run_until_idle();
//! assert!(done.get().is_ok());
//! assert_eq!(sum.get(), 15);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod combinator;
pub mod error;
pub mod future;
pub mod runtime;
pub mod tracing_compat;
pub mod types;

pub use combinator::{
    do_for_each, do_until, keep_doing, map_reduce, map_reduce_with, parallel_for_each, repeat,
    repeat_until_value, when_all, when_all_succeed, with_scheduling_group, with_timeout,
    with_timeout_factory, Adder, DefaultTimeoutFactory, Reduce, TimedOutError,
    TimeoutExceptionFactory,
};
pub use error::{Error, ErrorKind};
pub use future::futurize::{futurize, futurize_invoke, Futurize};
pub use future::{
    ignored_failure_count, make_exception_future, make_ready_future, now, Future, Promise,
};
pub use runtime::{
    create_scheduling_group, current_scheduling_group, later, sleep, ReactorConfig,
    SchedulingGroup, Timer,
};
pub use types::{StopIteration, Time};
