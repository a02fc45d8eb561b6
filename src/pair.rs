use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{future::Future, pin::Pin, task::{Context, Poll, Waker}};
use crate::shared::SharedConsumer;
use crate::{park, Error, Promise, Result};

/// This `pair::Producer` promise can only have one consumer. The consumer
/// yields a `Result<T, Error>`, either by `.await` or by a blocking
/// [`Consumer::wait`].
///
/// # Examples
///
/// ```
/// use thenable::{Promise, pair::Producer};
/// use std::thread;
/// let (promise, consumer) = Producer::<String>::new();
///
/// let task1 = thread::spawn(move || consumer.wait());
/// promise.resolve("Hi".into());
/// assert_eq!(task1.join().expect("The task1 thread has panicked.").unwrap(), "Hi");
/// ```
#[derive(Debug)]
pub struct Producer<T> {
    promise: Arc<Mutex<Inner<T>>>,
}

/// Read side of a promise. A consumer is either paired with a [`Producer`],
/// already settled, or deferred: a deferred consumer runs its work on the
/// thread that first reads it.
pub struct Consumer<T> {
    source: Source<T>,
}

type Thunk<T> = Box<dyn FnOnce() -> Result<T> + Send>;

enum Source<T> {
    Paired(Arc<Mutex<Inner<T>>>),
    Ready(Result<T>),
    Deferred(Thunk<T>),
    Spent,
}

#[derive(Debug)]
enum WakerState {
    Fresh,
    Tainted,
}

#[derive(Debug)]
struct Inner<T> {
    value: Option<Result<T>>,
    waker: Result<Waker, WakerState>,
}

impl<T> Producer<T> {
    fn settle(&self, outcome: Result<T>) {
        let waker = {
            let mut promise = self.promise.lock();
            promise.value = Some(outcome);
            std::mem::replace(&mut promise.waker, Err(WakerState::Tainted)).ok()
        };
        if let Some(waker) = waker {
            waker.wake()
        }
    }
}

impl<T> Promise<T> for Producer<T> {
    type Waiter = Consumer<T>;

    ///promise.resolve
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::pair::Producer;
    /// use thenable::Promise;
    /// use futures::executor::block_on;
    /// use std::thread;
    /// let (op, op_a) = Producer::<String>::new();
    /// let task1 = thread::spawn(move || block_on(async {
    ///     assert_eq!(op_a.await.unwrap(), "🍓");
    /// }));
    /// let task2 = thread::spawn(move || op.resolve(String::from("🍓")));
    /// task1.join().expect("The task1 thread has panicked");
    /// task2.join().expect("The task2 thread has panicked");
    /// ```
    fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    ///promise.reject
    fn reject(self, err: Error) {
        self.settle(Err(err));
    }

    fn new() -> (Self, Consumer<T>) {
        let inner = Arc::new(Mutex::new(Inner {
            value: None,
            waker: Err(WakerState::Fresh),
        }));
        (
            Self { promise: inner.clone() },
            Consumer {
                source: Source::Paired(inner),
            },
        )
    }
}

impl<T> Drop for Producer<T> {
    /// If this is an unresolved producer, fail the consumer and wake it.
    fn drop(&mut self) {
        let waker = {
            let mut promise = self.promise.lock();
            if matches!(promise.waker, Err(WakerState::Tainted)) {
                None
            } else {
                tracing::trace!("producer dropped without a value");
                promise.value = Some(Err(Error::ProducerDropped));
                std::mem::replace(&mut promise.waker, Err(WakerState::Tainted)).ok()
            }
        };
        if let Some(waker) = waker {
            waker.wake()
        }
    }
}

impl<T> Consumer<T> {
    /// A consumer that is already resolved with `value`.
    pub fn ready(value: T) -> Self {
        Self {
            source: Source::Ready(Ok(value)),
        }
    }

    /// A consumer that is already failed with `err`.
    pub fn failed(err: Error) -> Self {
        Self {
            source: Source::Ready(Err(err)),
        }
    }

    /// A consumer whose value is computed by `thunk` on the first read.
    pub fn deferred<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        Self {
            source: Source::Deferred(Box::new(thunk)),
        }
    }

    /// Blocks the current thread until the value is available.
    pub fn wait(self) -> Result<T> {
        park::block_on(self)
    }

    /// Blocks for at most `timeout`. Gives the consumer back if the value is
    /// not ready by then. A deferred consumer is handed back at once without
    /// running its work.
    pub fn wait_timeout(self, timeout: Duration) -> std::result::Result<Result<T>, Self> {
        if matches!(self.source, Source::Deferred(_)) {
            return Err(self);
        }
        park::block_until(self, Instant::now() + timeout)
    }

    /// Whether a read would complete without blocking or running deferred
    /// work.
    pub fn is_ready(&self) -> bool {
        match &self.source {
            Source::Paired(promise) => promise.lock().value.is_some(),
            Source::Ready(_) => true,
            Source::Deferred(_) | Source::Spent => false,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.source, Source::Deferred(_))
    }

    /// Converts into a consumer that may be read any number of times.
    pub fn share(self) -> SharedConsumer<T>
    where
        T: Clone,
    {
        SharedConsumer::new(self)
    }
}

// No field is ever pinned in place; `T` only moves in and out by value.
impl<T> Unpin for Consumer<T> {}

impl<T> Future for Consumer<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match std::mem::replace(&mut this.source, Source::Spent) {
            Source::Paired(promise) => {
                let polled = {
                    let mut inner = promise.lock();
                    match inner.value.take() {
                        Some(value) => Poll::Ready(value),
                        None => match std::mem::replace(&mut inner.waker, Ok(cx.waker().clone())) {
                            Err(WakerState::Tainted) => Poll::Ready(Err(Error::ProducerDropped)),
                            _ => Poll::Pending,
                        },
                    }
                };
                if polled.is_pending() {
                    this.source = Source::Paired(promise);
                }
                polled
            }
            Source::Ready(value) => Poll::Ready(value),
            Source::Deferred(thunk) => Poll::Ready(thunk()),
            Source::Spent => Poll::Ready(Err(Error::NoState)),
        }
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.source {
            Source::Paired(_) => "Paired",
            Source::Ready(Ok(_)) => "Ready",
            Source::Ready(Err(_)) => "Failed",
            Source::Deferred(_) => "Deferred",
            Source::Spent => "Spent",
        };
        f.debug_struct("Consumer").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
use futures::executor::block_on;
use std::thread;
use std::time::Duration;
use super::{Consumer, Producer};
use crate::{Error, Promise};

#[test]
fn test_pair_resolve() {
    let (op, op_a) = Producer::<String>::new();
    let task1 = thread::spawn(move || {
        block_on(async {
            op_a.await.unwrap()
        })
    });
    let task2 = thread::spawn(move || {
        op.resolve(String::from("🍓"));
    });
    assert_eq!(task1.join().expect("The task1 thread has panicked"), "🍓");
    task2.join().expect("The task2 thread has panicked");
}

#[test]
fn test_pair_unresolved() {
    let (op, op_a) = Producer::<String>::new();
    let task1 = thread::spawn(move || op_a.wait());
    let task2 = thread::spawn(move || {
        // Ensure we move the producer into this thread but we never resolve
        // it.
        std::mem::drop(op);
    });
    task2.join().expect("The task2 thread has panicked");
    let result = task1.join().expect("The task1 thread has panicked");
    assert!(matches!(result, Err(Error::ProducerDropped)));
}

#[test]
fn test_pair_no_consumer() {
    let (op, op_a) = Producer::<String>::new();
    let task1 = thread::spawn(move || {
        let _op_a = op_a;
    });
    let task2 = thread::spawn(move || {
        // Ensure we move the producer into this thread.
        op.resolve(String::from("🍓"));
    });
    task1.join().expect("The task1 thread has panicked");
    task2.join().expect("The task2 thread has panicked");
}

#[test]
fn test_pair_reject() {
    let (a, b) = Producer::<String>::new();
    let task1 = thread::spawn(|| b.wait());
    let task2 = thread::spawn(|| a.reject(Error::msg("reject!!")));
    task2.join().expect("The task2 thread has panicked");
    let err = task1.join().expect("The task1 thread has panicked").unwrap_err();
    assert_eq!(err.to_string(), "reject!!");
}

#[test]
fn test_resolve_before_wait() {
    let (a, b) = Producer::<u32>::new();
    a.resolve(3);
    assert!(b.is_ready());
    assert_eq!(b.wait().unwrap(), 3);
}

#[test]
fn test_ready_and_failed() {
    assert_eq!(Consumer::ready(1).wait().unwrap(), 1);
    assert!(Consumer::<u8>::failed(Error::ProducerDropped).wait().unwrap_err().is_broken_promise());
}

#[test]
fn test_deferred_runs_on_read() {
    let c = Consumer::deferred(|| Ok(thread::current().id()));
    assert!(c.is_deferred());
    assert!(!c.is_ready());
    assert_eq!(c.wait().unwrap(), thread::current().id());
}

#[test]
fn test_wait_timeout() {
    let (a, b) = Producer::<u32>::new();
    let b = b.wait_timeout(Duration::from_millis(10)).expect_err("nothing resolved yet");
    let task = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        a.resolve(9);
    });
    let value = b.wait_timeout(Duration::from_secs(5)).expect("resolved in time");
    assert_eq!(value.unwrap(), 9);
    task.join().expect("The task thread has panicked");
}

#[test]
fn test_wait_timeout_hands_back_deferred() {
    let c = Consumer::deferred(|| Ok(1));
    let c = c.wait_timeout(Duration::from_secs(1)).expect_err("deferred is not started");
    assert_eq!(c.wait().unwrap(), 1);
}
}
