//! The chaining primitive.

use crate::dispatch::{self, Continuation};
use crate::launch::{self, Launch};
use crate::pair::Consumer;
use crate::resolve::{Resolve, Resolved};

/// Chains `f` after `pred`.
///
/// The new link, run under `policy`, resolves `pred` all the way down, hands
/// the value to `f` in the shape `f` declares (see [`crate::dispatch`]) and
/// resolves whatever `f` returns. `then` itself returns at once.
///
/// If `pred` fails, `f` is not called and the returned consumer carries the
/// same error. If `f` returns an `Err` or panics, the returned consumer
/// carries that instead.
///
/// ```
/// use thenable::{then, Consumer, Launch};
/// let sum = then(Consumer::ready((2_i32, 3_i32)), |a: i32, b: i32| a + b, Launch::Deferred);
/// let text = then(sum, |n: i32| format!("{n}"), Launch::Async);
/// assert_eq!(text.wait().unwrap(), "5");
/// ```
pub fn then<P, F, S>(pred: P, f: F, policy: Launch) -> Consumer<Resolved<F::Output>>
where
    P: Resolve + Send + 'static,
    F: Continuation<Resolved<P>, S> + Send + 'static,
    F::Output: Resolve,
    Resolved<F::Output>: Send + 'static,
{
    launch::spawn(policy, move || dispatch::dispatch(pred.resolve()?, f))
}

/// Runs `f` lazily on the thread that first reads the returned consumer.
/// Arguments are captured by the closure. The result is not resolved.
///
/// ```
/// use thenable::defer;
/// let (a, b) = (20, 22);
/// let answer = defer(move || a + b);
/// assert_eq!(answer.wait().unwrap(), 42);
/// ```
pub fn defer<T, F>(f: F) -> Consumer<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    launch::spawn(Launch::Deferred, move || Ok(f()))
}

#[cfg(test)]
mod tests {
use super::{defer, then};
use crate::pair::{Consumer, Producer};
use crate::{Error, Launch, Promise};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ALL: [Launch; 4] = [Launch::Async, Launch::Deferred, Launch::Auto, Launch::Detached];

#[test]
fn test_then_waits_for_producer() {
    let (op, op_a) = Producer::<i32>::new();
    let next = then(op_a, |x: i32| x + 1, Launch::Detached);
    let task = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        op.resolve(5);
    });
    assert_eq!(next.wait().unwrap(), 6);
    task.join().expect("The task thread has panicked");
}

#[test]
fn test_continuation_error_surfaces_unchanged() {
    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("bad input {0}")]
    struct BadInput(i32);

    for policy in ALL {
        let next = then(
            Consumer::ready(3_i32),
            |x: i32| -> Result<i32, BadInput> { Err(BadInput(x)) },
            policy,
        );
        let err = next.wait().unwrap_err();
        assert_eq!(err.downcast_ref::<BadInput>(), Some(&BadInput(3)));
        assert_eq!(err.to_string(), "bad input 3");
    }
}

#[test]
fn test_failed_predecessor_skips_continuation() {
    for policy in ALL {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let next = then(
            Consumer::<i32>::failed(Error::msg("upstream")),
            move |x: i32| {
                counter.fetch_add(1, Ordering::SeqCst);
                x
            },
            policy,
        );
        let counter = calls.clone();
        let after = then(
            next,
            move |x: i32| {
                counter.fetch_add(1, Ordering::SeqCst);
                x
            },
            policy,
        );
        assert_eq!(after.wait().unwrap_err().to_string(), "upstream");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn test_returned_future_is_flattened() {
    let next = then(
        Consumer::ready(2_i32),
        |x: i32| then(Consumer::ready(x), |y: i32| Consumer::ready(y * 10), Launch::Detached),
        Launch::Detached,
    );
    assert_eq!(next.wait().unwrap(), 20);
}

#[test]
fn test_void_chain() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let first = then(Consumer::ready(4_usize), move |x: usize| {
        counter.store(x, Ordering::SeqCst);
    }, Launch::Detached);
    let second = then(first, || "done", Launch::Detached);
    assert_eq!(second.wait().unwrap(), "done");
    assert_eq!(seen.load(Ordering::SeqCst), 4);
}

#[test]
fn test_broken_promise_propagates() {
    let (op, op_a) = Producer::<i32>::new();
    let next = then(op_a, |x: i32| x, Launch::Detached);
    drop(op);
    assert!(next.wait().unwrap_err().is_broken_promise());
}

#[test]
fn test_defer_is_lazy() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let later = defer(move || counter.fetch_add(1, Ordering::SeqCst) + 1);
    thread::sleep(Duration::from_millis(10));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(later.wait().unwrap(), 1);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}
}
