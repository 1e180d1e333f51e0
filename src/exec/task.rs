/// Where a piece of work is being submitted from.
///
/// Work submitted from inside a worker task must not be sent back to the
/// worker pool, which could otherwise end up waiting on itself: it runs inline
/// and serially on the submitting thread instead. The context is passed
/// explicitly to every pass rather than being inferred from the current
/// thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskContext {
    depth: usize,
}

impl TaskContext {

    /// The caller which owns the top-level pass
    pub fn master() -> Self { Self { depth: 0 } }

    pub fn is_master(&self) -> bool { self.depth == 0 }

    /// Is this context inside a worker task?
    pub fn within_task(&self) -> bool { self.depth > 0 }

    pub fn depth(&self) -> usize { self.depth }

    /// The context seen by work running inside a task spawned from this one
    pub fn enter(self) -> Self { Self { depth: self.depth + 1 } }
}

impl Default for TaskContext {
    fn default() -> Self { Self::master() }
}
