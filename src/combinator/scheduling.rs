//! Dispatch to a named execution bucket.

use crate::future::futurize::{futurize_invoke, Futurize};
use crate::future::{Future, Promise};
use crate::runtime::{self, SchedulingGroup};

/// Runs a callable under a scheduling group.
///
/// If `sg` is the group currently running, the callable is invoked
/// immediately and its result futurized. Otherwise a task tagged with `sg`
/// is enqueued; it runs the callable and forwards the result into the
/// returned future.
pub fn with_scheduling_group<F, R>(sg: SchedulingGroup, func: F) -> Future<R::Value>
where
    F: FnOnce() -> R + 'static,
    R: Futurize,
{
    if sg.active() {
        futurize_invoke(func)
    } else {
        let mut pr = Promise::new();
        let out = pr.get_future();
        runtime::schedule_in_group(sg, move || {
            futurize_invoke(func).forward_to(pr);
        });
        out
    }
}
