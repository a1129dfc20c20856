//! Thin adaptors exposing the cell at callback boundaries.
//!
//! None of these add semantics of their own: each converts some external
//! completion style into a [`Thunk`] producer and lets the cell do the rest.

use crate::cell::{Completer, Thunk};
use crate::Host;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A then-style external promise: one shot, success or failure.
pub trait ExternalPromise<T, E> {
    /// Hands the promise its continuation callbacks; exactly one should
    /// eventually run.
    fn subscribe(self, on_resolve: Box<dyn FnOnce(T)>, on_reject: Box<dyn FnOnce(E)>);
}

/// Bridges an external promise into a cell: success forwards as a resolve,
/// failure as a rejection.
pub fn from_promise<T, E, P>(host: &Host, promise: P) -> Thunk<T, E>
where
    T: 'static,
    E: Debug + 'static,
    P: ExternalPromise<T, E>,
{
    Thunk::new(host, move |done| {
        let failed = done.clone();
        promise.subscribe(
            Box::new(move |value| done.resolve(value)),
            Box::new(move |error| failed.reject(error)),
        );
    })
}

/// Converts a callback-last function into a factory of cells.
///
/// Each invocation of the returned factory runs `f` with the arguments and a
/// fresh completer, and returns the cell `f` will settle. Only callables are
/// accepted, by construction of the `Fn` bound.
pub fn thunkify<A, T, E, F>(host: &Host, f: F) -> impl Fn(A) -> Thunk<T, E>
where
    A: 'static,
    T: 'static,
    E: Debug + 'static,
    F: Fn(A, Completer<T, E>) + 'static,
{
    let host = host.clone();
    let f = Arc::new(f);
    move |args| {
        let f = Arc::clone(&f);
        Thunk::new(&host, move |done| (*f)(args, done))
    }
}

/// A fixed set of named callback operations on one receiver.
///
/// This is the capability query behind [`thunkify_all`]: the receiver states
/// which operations it exposes instead of being reflected over, and anything
/// it does not report is not adapted.
pub trait NamedOperations {
    type Args;
    type Value;
    type Error: Debug;

    /// The operation names this receiver exposes.
    fn names(&self) -> Vec<&'static str>;

    /// Runs the named operation, settling `done` when it finishes.
    fn invoke(&self, name: &str, args: Self::Args, done: Completer<Self::Value, Self::Error>);
}

/// A cell factory produced by [`thunkify_all`].
pub type Factory<A, T, E> = Box<dyn Fn(A) -> Thunk<T, E>>;

/// Adapts every operation a receiver reports into a cell factory bound to
/// that receiver.
pub fn thunkify_all<S>(
    host: &Host,
    receiver: Arc<S>,
) -> HashMap<&'static str, Factory<S::Args, S::Value, S::Error>>
where
    S: NamedOperations + 'static,
    S::Args: 'static,
    S::Value: 'static,
    S::Error: Debug + 'static,
{
    receiver
        .names()
        .into_iter()
        .map(|name| {
            let host = host.clone();
            let receiver = Arc::clone(&receiver);
            let factory: Factory<S::Args, S::Value, S::Error> = Box::new(move |args| {
                let receiver = Arc::clone(&receiver);
                Thunk::new(&host, move |done| receiver.invoke(name, args, done))
            });
            (name, factory)
        })
        .collect()
}
