//! `then` for thread-backed promises.
//!
//! A [`Consumer`](pair::Consumer) is the read side of a one-shot promise.
//! [`then`] chains a continuation onto anything that can be
//! [resolved](Resolve): the predecessor is read (recursively, so a future of
//! a future of `T` yields a `T`), the continuation is called with the value,
//! and whatever it returns is resolved the same way before it lands in the
//! new consumer.
//!
//! ```
//! use thenable::{then, Launch, Producer, Promise};
//! let (promise, consumer) = Producer::<i32>::new();
//! let next = then(consumer, |x: i32| x + 1, Launch::Detached);
//! promise.resolve(5);
//! assert_eq!(next.wait().unwrap(), 6);
//! ```
//!
//! Failures never escape on the thread that produced them. They are stored
//! in the link's promise and come back out of [`Consumer::wait`](pair::Consumer::wait)
//! (or `.await`), and any links chained after a failure skip their
//! continuation and carry the same error.

pub mod await_all;
pub mod config;
pub mod dispatch;
mod error;
pub mod launch;
pub mod make_promise;
pub mod pair;
mod park;
pub mod parallel;
pub mod resolve;
pub mod shared;
pub mod then;
pub mod thenable;
pub mod timeout;
pub mod waterfall;

pub use crate::await_all::await_all;
pub use crate::error::{Error, Result};
pub use crate::launch::Launch;
pub use crate::make_promise::{make_promise, Rejecter, Resolver};
pub use crate::pair::{Consumer, Producer};
pub use crate::parallel::{parallel, parallel_iter, parallel_n, ParallelResult};
pub use crate::resolve::{Plain, Resolve, Resolved};
pub use crate::shared::SharedConsumer;
pub use crate::then::{defer, then};
pub use crate::thenable::{to_thenable, IntoThenable, SharedThenable, Thenable, ThenablePromise};
pub use crate::timeout::{delay, timeout};
pub use crate::waterfall::waterfall;

/// The write side of a promise. Exactly one of `resolve` or `reject` may be
/// called, and both consume the promise. Dropping it unresolved fails the
/// waiter with [`Error::ProducerDropped`].
pub trait Promise<T> {
    type Waiter;

    fn new() -> (Self, Self::Waiter)
    where
        Self: Sized;

    fn resolve(self, value: T);

    fn reject(self, err: Error);
}
