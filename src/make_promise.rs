//! Bridges callback-style APIs into a consumer.

use crate::launch::{self, Launch};
use crate::pair::{Consumer, Producer};
use crate::{Error, Promise};
use parking_lot::Mutex;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

type Slot<T> = Arc<Mutex<Option<Producer<T>>>>;

/// Takes the producer out of `slot`. Only the first caller gets it.
fn commit<T>(slot: &Slot<T>, what: &str) -> Option<Producer<T>> {
    let producer = slot.lock().take();
    if producer.is_none() {
        tracing::debug!(what, "promise already settled, ignoring");
    }
    producer
}

/// The resolve callback handed to a [`make_promise`] adapter.
pub struct Resolver<T> {
    slot: Slot<T>,
}

impl<T> Resolver<T> {
    /// Resolves the promise with `value`. Returns `false`, and drops `value`,
    /// if the promise was already settled.
    pub fn resolve(&self, value: T) -> bool {
        match commit(&self.slot, "resolve") {
            Some(producer) => {
                producer.resolve(value);
                true
            }
            None => false,
        }
    }
}

/// The reject callback handed to a [`make_promise`] adapter.
pub struct Rejecter<T> {
    slot: Slot<T>,
}

impl<T> Rejecter<T> {
    /// Rejects the promise with `err`. Returns `false` if the promise was
    /// already settled.
    pub fn reject<E>(&self, err: E) -> bool
    where
        E: StdError + Send + Sync + 'static,
    {
        match commit(&self.slot, "reject") {
            Some(producer) => {
                producer.reject(Error::reject(err));
                true
            }
            None => false,
        }
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Clone for Rejecter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.slot.lock().is_none())
            .finish()
    }
}

impl<T> fmt::Debug for Rejecter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejecter")
            .field("settled", &self.slot.lock().is_none())
            .finish()
    }
}

/// Calls `adapter` with a resolve and a reject callback under `policy` and
/// returns the consumer they settle.
///
/// Whichever callback runs first commits the outcome; later calls are
/// ignored and report `false`. The callbacks may be cloned and moved to
/// other threads. If `adapter` panics before settling, the promise is
/// rejected with [`Error::Panicked`]. If every callback is dropped unused,
/// the consumer fails with [`Error::ProducerDropped`].
///
/// ```
/// use thenable::{make_promise, Launch};
/// use std::thread;
/// let answer = make_promise(
///     |resolve, _reject| {
///         thread::spawn(move || resolve.resolve(42_u32));
///     },
///     Launch::Async,
/// );
/// assert_eq!(answer.wait().unwrap(), 42);
/// ```
pub fn make_promise<T, F>(adapter: F, policy: Launch) -> Consumer<T>
where
    T: Send + 'static,
    F: FnOnce(Resolver<T>, Rejecter<T>) + Send + 'static,
{
    launch::spawn(policy, move || {
        let (producer, consumer) = Producer::new();
        let slot: Slot<T> = Arc::new(Mutex::new(Some(producer)));
        let resolver = Resolver { slot: slot.clone() };
        let rejecter = Rejecter { slot: slot.clone() };
        if let Err(err) = launch::guarded(move || {
            adapter(resolver, rejecter);
            Ok(())
        }) {
            if let Some(producer) = commit(&slot, "reject") {
                producer.reject(err);
            }
        }
        drop(slot);
        consumer.wait()
    })
}
