//! One-shot, multi-observer deferred result cell.
//!
//! A [`Thunk`] wraps a single callback-style asynchronous operation. The
//! producer runs once, synchronously, and settles the cell through its
//! [`Completer`]; any number of observers subscribe to the latched outcome,
//! each notified at most once. A failing observer never disturbs the others,
//! and a rejection nobody subscribes to escalates as a [`Fault`] one
//! scheduling turn later instead of vanishing.
//!
//! Scheduling is injected: the cell only ever defers fault escalation, never
//! its own state transitions, so any host loop that can run a boxed closure
//! "next turn" will do. [`TurnQueue`] is the provided implementation.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use thunk_cell::{Host, Thunk, TurnQueue};
//!
//! let queue = Arc::new(TurnQueue::new());
//! let host = Host::new(queue.clone());
//!
//! let cell: Thunk<i32, String> = Thunk::new(&host, |done| done.resolve(42));
//! cell.observe(|outcome| assert_eq!(outcome.as_ref().ok(), Some(&42)));
//! queue.run_until_idle();
//! ```

pub mod adapt;
pub mod cell;
pub mod fault;
pub mod turn;

pub use adapt::{from_promise, thunkify, thunkify_all, ExternalPromise, Factory, NamedOperations};
pub use cell::{is_thunk, Completer, Outcome, Thunk};
pub use fault::{CapturingSink, FatalSink, Fault, PanickingSink};
pub use turn::{TurnQueue, TurnScheduler};

use std::sync::Arc;
use thiserror::Error;

/// Why a cell settled without a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection<E> {
    /// The producer signalled an error through its completer.
    #[error("rejected by producer")]
    Rejected(E),
    /// The producer panicked before signalling completion; the panic message
    /// is latched as the outcome.
    #[error("producer panicked: {0}")]
    ProducerPanic(String),
}

/// Constructor-time dependencies of a cell: where deferred work goes and
/// where fatal errors surface.
#[derive(Clone)]
pub struct Host {
    pub(crate) scheduler: Arc<dyn TurnScheduler>,
    pub(crate) sink: Arc<dyn FatalSink>,
}

impl Host {
    /// A host whose faults panic on the turn they are raised.
    pub fn new(scheduler: Arc<dyn TurnScheduler>) -> Self {
        Self::with_sink(scheduler, Arc::new(PanickingSink))
    }

    /// Substitutes the fatal-error sink, e.g. a [`CapturingSink`] in tests.
    pub fn with_sink(scheduler: Arc<dyn TurnScheduler>, sink: Arc<dyn FatalSink>) -> Self {
        Host { scheduler, sink }
    }
}
