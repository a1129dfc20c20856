//! The "next scheduling turn" primitive.

use std::collections::VecDeque;
use std::sync::Mutex;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

/// An externally supplied "defer to next turn" primitive.
///
/// A cell's own state transitions are fully synchronous; the only work it
/// ever defers is fault escalation and the unclaimed-rejection check. Hosts
/// with their own event loop implement this over it.
pub trait TurnScheduler {
    fn defer(&self, task: Task);
}

/// A strict-FIFO turn queue.
///
/// Ordering guarantee: tasks run in the order they were deferred, after all
/// synchronous work of the turn that deferred them. A task deferred while
/// the queue is draining runs in the same drain, after everything already
/// queued. Hosts substituting their own [`TurnScheduler`] must document
/// their own ordering; the cell assumes nothing beyond "later than now".
#[derive(Default)]
pub struct TurnQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs queued tasks until none remain, including tasks deferred by the
    /// tasks themselves. The lock is released while each task runs, so tasks
    /// are free to defer more work.
    pub fn run_until_idle(&self) {
        loop {
            let task = self.tasks.lock().unwrap().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.lock().unwrap().is_empty()
    }
}

impl TurnScheduler for TurnQueue {
    fn defer(&self, task: Task) {
        self.tasks.lock().unwrap().push_back(task);
    }
}
