//! Fatal-error escalation.
//!
//! Latched rejections are data an observer can recover from. The errors in
//! this module are not: an observer that panics, or a rejection nobody ever
//! subscribed to, is a programmer bug. The cell catches such errors locally
//! and hands them to a [`FatalSink`] on a later scheduling turn, where the
//! default sink panics rather than letting them disappear.

use std::any::Any;
use std::sync::Mutex;
use thiserror::Error;

/// An error deliberately escalated past normal recoverable handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// A latched rejection with no subscriber one turn after the latch.
    #[error("unhandled rejection: {0}")]
    UnclaimedRejection(String),
    /// An observer panicked while being notified.
    #[error("observer panicked: {0}")]
    ObserverPanic(String),
    /// The producer panicked after the cell had already completed, so the
    /// panic could not be latched as the outcome.
    #[error("producer panicked after completion: {0}")]
    ProducerPanic(String),
}

/// Destination for faults, injected into a cell at construction.
///
/// The cell never calls `raise` synchronously from a producer, subscription,
/// or observer invocation; every raise is deferred through the host's
/// [`TurnScheduler`](crate::TurnScheduler) first.
pub trait FatalSink {
    fn raise(&self, fault: Fault);
}

/// Panics with the fault. The panic happens inside the deferred task, so it
/// propagates to whatever drains the turn queue, not to the code that caused
/// the fault.
pub struct PanickingSink;

impl FatalSink for PanickingSink {
    fn raise(&self, fault: Fault) {
        panic!("{fault}");
    }
}

/// Records faults instead of panicking, for tests and for embedders that
/// report faults through their own channels.
#[derive(Default)]
pub struct CapturingSink {
    faults: Mutex<Vec<Fault>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains every fault captured so far.
    pub fn take(&self) -> Vec<Fault> {
        std::mem::take(&mut *self.faults.lock().unwrap())
    }

    pub fn is_empty(&self) -> bool {
        self.faults.lock().unwrap().is_empty()
    }
}

impl FatalSink for CapturingSink {
    fn raise(&self, fault: Fault) {
        self.faults.lock().unwrap().push(fault);
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
