//! The deferred result cell.
//!
//! A one-shot producer settles the cell exactly once; observers subscribe
//! before or after that and each sees the latched outcome exactly once.
//! Observers registered before completion are drained in subscription order;
//! later subscribers replay immediately. Observer failures are isolated from
//! each other and resurface as [`Fault`]s on a later turn.

use crate::fault::{panic_message, Fault};
use crate::{Host, Rejection};
use log::trace;
use std::any::Any;
use std::fmt::Debug;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// The latched outcome, shared by every observer of one cell.
pub type Outcome<T, E> = Arc<Result<T, Rejection<E>>>;

type Observer<T, E> = Box<dyn FnOnce(&Result<T, Rejection<E>>)>;

/// Completion is a latch: the transition out of `AwaitingCompletion` fires
/// exactly once and nothing leaves `Completed`. Carrying the outcome in the
/// variant makes "completed without an outcome" unrepresentable.
enum State<T, E> {
    AwaitingCompletion,
    Completed(Outcome<T, E>),
}

struct Inner<T, E> {
    state: State<T, E>,
    /// Orthogonal to `state`: flips true on the first subscription in either
    /// state, and is consulted only by the unclaimed-rejection check.
    has_subscriber: bool,
    /// Observers registered before completion, in subscription order.
    /// Drained exactly once, at latch time.
    pending: Vec<Observer<T, E>>,
}

/// One-shot, multi-observer result cell.
///
/// Constructing the cell runs the producer synchronously; the producer (or
/// anything it hands its [`Completer`] to) settles the cell once. Handles are
/// cheap to clone and all refer to the same cell.
pub struct Thunk<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
    host: Host,
}

impl<T, E> Clone for Thunk<T, E> {
    fn clone(&self) -> Self {
        Thunk {
            inner: Arc::clone(&self.inner),
            host: self.host.clone(),
        }
    }
}

/// The settle side of a cell, handed to the producer.
///
/// Clonable so the producer can route it into separate success and failure
/// paths; only the first settle latches, the rest are silent no-ops.
pub struct Completer<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
    host: Host,
}

impl<T, E> Clone for Completer<T, E> {
    fn clone(&self) -> Self {
        Completer {
            inner: Arc::clone(&self.inner),
            host: self.host.clone(),
        }
    }
}

impl<T: 'static, E: Debug + 'static> Completer<T, E> {
    /// Latches a successful outcome and drains pending observers.
    pub fn resolve(self, value: T) {
        settle(&self.inner, &self.host, Ok(value));
    }

    /// Latches a rejection and drains pending observers. If nothing ever
    /// subscribes, the rejection escalates as a
    /// [`Fault::UnclaimedRejection`] one turn later.
    pub fn reject(self, error: E) {
        settle(&self.inner, &self.host, Err(Rejection::Rejected(error)));
    }
}

impl<T: 'static, E: Debug + 'static> Thunk<T, E> {
    /// Creates a cell and runs `producer` synchronously with its completer.
    ///
    /// A producer panic before completion is latched as
    /// [`Rejection::ProducerPanic`], exactly as if the completer had been
    /// invoked with it. A panic after completion cannot be latched (the
    /// latch already won), so it escalates as [`Fault::ProducerPanic`] on a
    /// later turn.
    pub fn new(host: &Host, producer: impl FnOnce(Completer<T, E>)) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            state: State::AwaitingCompletion,
            has_subscriber: false,
            pending: Vec::new(),
        }));
        let thunk = Thunk {
            inner: Arc::clone(&inner),
            host: host.clone(),
        };
        let completer = Completer {
            inner,
            host: host.clone(),
        };
        if let Err(payload) = catch_unwind(AssertUnwindSafe(move || producer(completer))) {
            let message = panic_message(payload.as_ref());
            let latched = settle(
                &thunk.inner,
                &thunk.host,
                Err(Rejection::ProducerPanic(message.clone())),
            );
            if !latched {
                let sink = Arc::clone(&thunk.host.sink);
                thunk
                    .host
                    .scheduler
                    .defer(Box::new(move || sink.raise(Fault::ProducerPanic(message))));
            }
        }
        thunk
    }

    /// Subscribes `observer` to the latched outcome.
    ///
    /// Before completion this appends to the pending list and returns; after
    /// completion it replays the outcome immediately. Either way the
    /// invocation is isolated: a panicking observer never reaches this call
    /// site, other observers, or the cell's state, and resurfaces as a
    /// [`Fault::ObserverPanic`] on a later turn.
    pub fn observe(&self, observer: impl FnOnce(&Result<T, Rejection<E>>) + 'static) {
        let mut cell = self.inner.lock().unwrap();
        cell.has_subscriber = true;
        let replay = match &cell.state {
            State::AwaitingCompletion => None,
            State::Completed(outcome) => Some(Arc::clone(outcome)),
        };
        match replay {
            None => cell.pending.push(Box::new(observer)),
            Some(outcome) => {
                drop(cell);
                invoke_isolated(&self.host, Box::new(observer), &outcome);
            }
        }
    }

    /// Promise-style subscription: a distinct entry point instead of an
    /// arity-dispatched overload of [`observe`](Self::observe). Exactly one
    /// of the callbacks runs, with the latched outcome.
    pub fn then(
        &self,
        on_ok: impl FnOnce(&T) + 'static,
        on_err: impl FnOnce(&Rejection<E>) + 'static,
    ) {
        self.observe(move |outcome| match outcome {
            Ok(value) => on_ok(value),
            Err(rejection) => on_err(rejection),
        });
    }
}

/// Identity predicate: true exactly for [`Thunk<T, E>`] handles, false for
/// any other value including ordinary closures and functions.
pub fn is_thunk<T: 'static, E: 'static>(value: &dyn Any) -> bool {
    value.is::<Thunk<T, E>>()
}

/// Latches `result` if the cell is still awaiting completion and drains the
/// pending observers. Returns whether this call won the latch.
fn settle<T: 'static, E: Debug + 'static>(
    inner: &Arc<Mutex<Inner<T, E>>>,
    host: &Host,
    result: Result<T, Rejection<E>>,
) -> bool {
    let (outcome, drained, unclaimed) = {
        let mut cell = inner.lock().unwrap();
        if let State::Completed(_) = cell.state {
            trace!("settle after latch ignored");
            return false;
        }
        let outcome: Outcome<T, E> = Arc::new(result);
        cell.state = State::Completed(Arc::clone(&outcome));
        let drained = mem::take(&mut cell.pending);
        let unclaimed = match (&*outcome, cell.has_subscriber) {
            (Err(rejection), false) => Some(format!("{rejection:?}")),
            _ => None,
        };
        (outcome, drained, unclaimed)
    };
    trace!("latched, draining {} observer(s)", drained.len());

    if let Some(description) = unclaimed {
        // Nobody is watching yet; give them one turn before escalating.
        let inner = Arc::clone(inner);
        let sink = Arc::clone(&host.sink);
        host.scheduler.defer(Box::new(move || {
            if inner.lock().unwrap().has_subscriber {
                trace!("rejection claimed before escalation");
            } else {
                sink.raise(Fault::UnclaimedRejection(description));
            }
        }));
    }

    // Drained outside the lock: an observer may subscribe to or settle this
    // same cell while it runs.
    for observer in drained {
        invoke_isolated(host, observer, &outcome);
    }
    true
}

fn invoke_isolated<T, E>(host: &Host, observer: Observer<T, E>, outcome: &Outcome<T, E>) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| observer(&**outcome))) {
        let message = panic_message(payload.as_ref());
        trace!("observer panicked: {message}");
        let sink = Arc::clone(&host.sink);
        host.scheduler
            .defer(Box::new(move || sink.raise(Fault::ObserverPanic(message))));
    }
}
