//! Run an action over a sequence concurrently.

use smallvec::SmallVec;

use crate::error::Error;
use crate::future::continuation::{set_callback, Continuation};
use crate::future::futurize::{futurize_invoke, Futurize};
use crate::future::{make_ready_future, Future, Promise};
use crate::tracing_compat::trace;

/// Waits for one of the futures in `incomplete` at a time, draining from
/// the back on the assumption that earlier-started operations resolve
/// first. If they do, the back futures turn out already available and no
/// further continuation is needed for them.
struct ParallelForEachState {
    incomplete: SmallVec<[Future<()>; 4]>,
    result: Promise<()>,
    ex: Option<Error>,
}

impl ParallelForEachState {
    fn new(reserve: usize) -> Self {
        let mut incomplete = SmallVec::new();
        incomplete.reserve(reserve);
        Self {
            incomplete,
            result: Promise::new(),
            ex: None,
        }
    }

    fn add_future(&mut self, f: Future<()>) {
        self.incomplete.push(f);
    }

    fn wait_for_one(mut self: Box<Self>) {
        // Skip over futures that happen to be complete already, absorbing
        // their failures; park on the first incomplete one.
        while let Some(f) = self.incomplete.pop() {
            if !f.available() {
                trace!(
                    remaining = self.incomplete.len() + 1,
                    "parallel_for_each waiting"
                );
                set_callback(f, self);
                return;
            }
            if let Err(e) = f.get() {
                self.ex = Some(e);
            }
        }
        // Everything completed; report.
        let Self { result, ex, .. } = *self;
        match ex {
            Some(e) => result.set_exception(e),
            None => result.set_value(()),
        }
    }
}

impl Continuation<()> for ParallelForEachState {
    fn complete(mut self: Box<Self>, result: Result<(), Error>) {
        if let Err(e) = result {
            self.ex = Some(e);
        }
        self.wait_for_one();
    }
}

/// Invokes `action` on every element of `range`, starting each invocation
/// in iteration order without awaiting the previous one.
///
/// Returns a future that resolves once every invocation has resolved. If
/// one or more invocations fail, the returned future fails with one of the
/// failures, but only after *all* invocations have completed. An action
/// that panics, or returns an error synchronously, counts as a failed
/// invocation.
///
/// When every invocation completes immediately, no internal state is
/// allocated and the result is ready on return.
pub fn parallel_for_each<I, A, R>(range: I, mut action: A) -> Future<()>
where
    I: IntoIterator,
    A: FnMut(I::Item) -> R,
    R: Futurize<Value = ()>,
{
    let mut state: Option<Box<ParallelForEachState>> = None;
    let mut ex: Option<Error> = None;
    // Give each future the following treatment:
    //   - available, not failed: discard
    //   - available, failed: collect the exception in ex
    //   - not available: collect in state (allocating it if needed)
    let mut iter = range.into_iter();
    while let Some(item) = iter.next() {
        let f = futurize_invoke(|| action(item));
        if f.available() {
            if let Err(e) = f.get() {
                ex = Some(e);
            }
        } else {
            let s = state.get_or_insert_with(|| {
                let (remaining, _) = iter.size_hint();
                Box::new(ParallelForEachState::new(remaining + 1))
            });
            s.add_future(f);
        }
    }
    match state {
        // Some futures were incomplete; hand off to the state, which owns
        // itself from here on (it chains itself to the futures it holds).
        Some(mut s) => {
            if let Some(e) = ex {
                s.ex = Some(e);
            }
            let result = s.result.get_future();
            s.wait_for_one();
            result
        }
        None => match ex {
            Some(e) => Future::from_error(e),
            None => make_ready_future(()),
        },
    }
}
