//! A `SharedConsumer` can be cloned and read by many consumers. Every reader
//! gets its own copy of the value, or of the error.

use crate::pair::Consumer;
use crate::{park, Result};
use futures::future::{FutureExt, Shared};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// # Examples
///
/// ```
/// use thenable::{Promise, pair::Producer};
/// use std::thread;
/// let (promise, consumer) = Producer::<String>::new();
/// let consumer = consumer.share();
/// let consumer2 = consumer.clone();
/// let task1 = thread::spawn(move || consumer.wait());
/// let task2 = thread::spawn(move || consumer2.wait());
/// promise.resolve("Hi".into());
/// assert_eq!(task1.join().expect("The task1 thread has panicked.").unwrap(), "Hi");
/// assert_eq!(task2.join().expect("The task2 thread has panicked.").unwrap(), "Hi");
/// ```
pub struct SharedConsumer<T> {
    inner: Shared<Consumer<T>>,
    deferred: bool,
}

impl<T: Clone> SharedConsumer<T> {
    pub(crate) fn new(consumer: Consumer<T>) -> Self {
        Self {
            deferred: consumer.is_deferred(),
            inner: consumer.shared(),
        }
    }

    /// Blocks the current thread until the value is available and returns a
    /// copy of it. Other clones are unaffected.
    pub fn wait(&self) -> Result<T> {
        park::block_on(self.inner.clone())
    }

    /// Whether a read would complete without blocking. Deferred work is
    /// never started here, so a deferred source reports `false` until some
    /// clone has been read.
    pub fn is_ready(&self) -> bool {
        if self.inner.peek().is_some() {
            return true;
        }
        if self.deferred {
            return false;
        }
        // `Shared` only caches the output once it has been polled.
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        self.inner.clone().poll_unpin(&mut cx).is_ready()
    }
}

impl<T> Clone for SharedConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            deferred: self.deferred,
        }
    }
}

impl<T: Clone> Future for SharedConsumer<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl<T> std::fmt::Debug for SharedConsumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConsumer").finish_non_exhaustive()
    }
}
