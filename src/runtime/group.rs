//! Scheduling groups.
//!
//! A scheduling group is a named bucket the reactor uses to apportion CPU
//! across classes of work. This crate's reactor keeps a single FIFO queue
//! and merely tags tasks with their group; fair scheduling across groups
//! belongs to a richer reactor and is out of scope here. What the
//! combinators rely on is the identity: which group is running now, and
//! whether a given group is the active one.

use core::fmt;

use super::{current_group_id, with_group_registry};

/// Identity of a scheduling group.
///
/// Copyable value type; the group's name lives in the reactor's registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchedulingGroup(u32);

impl SchedulingGroup {
    pub(crate) const MAIN: Self = Self(0);

    /// Returns true if this group is the one currently running.
    #[must_use]
    pub fn active(self) -> bool {
        current_group_id() == self
    }

    /// Returns the group's registered name.
    #[must_use]
    pub fn name(self) -> String {
        with_group_registry(|names| {
            names
                .get(self.0 as usize)
                .cloned()
                .unwrap_or_else(|| String::from("<unregistered>"))
        })
    }
}

impl Default for SchedulingGroup {
    /// The main group every thread starts in.
    fn default() -> Self {
        Self::MAIN
    }
}

impl fmt::Debug for SchedulingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchedulingGroup({}, {:?})", self.0, self.name())
    }
}

/// Registers a new scheduling group with the current thread's reactor.
pub fn create_scheduling_group(name: impl Into<String>) -> SchedulingGroup {
    let name = name.into();
    with_group_registry(|names| {
        let id = u32::try_from(names.len()).expect("scheduling group registry overflow");
        names.push(name);
        SchedulingGroup(id)
    })
}

/// Returns the scheduling group of the currently-running task, or the main
/// group outside of any task.
#[must_use]
pub fn current_scheduling_group() -> SchedulingGroup {
    current_group_id()
}
