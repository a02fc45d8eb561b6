//! Launch strategies for a chain link.
//!
//! A link is a unit of work that produces one value: read the predecessor,
//! call the continuation, resolve its result. [`Launch`] picks where that
//! work runs. Whatever the strategy, a failure or panic inside the work is
//! caught at the link boundary and becomes the outcome of the link's
//! consumer; it is never raised on the thread that ran the work.

use crate::pair::{Consumer, Producer};
use crate::{config, Error, Promise, Result};
use futures::executor::ThreadPool;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Launch {
    /// Run the link concurrently: on the shared worker pool while it has an
    /// idle worker, otherwise on a dedicated thread. Never deferred.
    Async,
    /// Run the link on the thread that first reads its consumer.
    Deferred,
    /// Same as `Async` while the worker pool exists. If the pool could not
    /// be built, the link is deferred instead of getting its own thread.
    Auto,
    /// Run the link on its own detached thread. The spawning call never
    /// waits for it, and the thread owns the link's producer until it is
    /// done.
    Detached,
}

impl Default for Launch {
    /// The process-wide default from [`config::get`].
    fn default() -> Self {
        config::get().default_launch
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown launch policy {0:?}, expected async, deferred, auto or detached")]
pub struct ParseLaunchError(String);

impl FromStr for Launch {
    type Err = ParseLaunchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async" => Ok(Launch::Async),
            "deferred" => Ok(Launch::Deferred),
            "auto" => Ok(Launch::Auto),
            "detached" => Ok(Launch::Detached),
            _ => Err(ParseLaunchError(s.to_owned())),
        }
    }
}

impl fmt::Display for Launch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Launch::Async => "async",
            Launch::Deferred => "deferred",
            Launch::Auto => "auto",
            Launch::Detached => "detached",
        })
    }
}

enum Strategy {
    Pooled(&'static Pool),
    Deferred,
    Detached,
}

impl Launch {
    fn strategy(self) -> Strategy {
        match self {
            Launch::Async => pool().map_or(Strategy::Detached, Strategy::Pooled),
            Launch::Auto => pool().map_or(Strategy::Deferred, Strategy::Pooled),
            Launch::Deferred => Strategy::Deferred,
            Launch::Detached => Strategy::Detached,
        }
    }
}

/// The shared worker pool plus a count of the links it currently holds.
///
/// A link reading its predecessor parks its worker. Links are only handed
/// to the pool while `busy < size`, so a submitted link never waits in the
/// queue behind parked workers; the rest get a dedicated thread.
struct Pool {
    executor: ThreadPool,
    size: usize,
    busy: AtomicUsize,
}

impl Pool {
    fn lease(&'static self) -> Option<Lease> {
        self.busy
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |busy| {
                (busy < self.size).then_some(busy + 1)
            })
            .ok()
            .map(|_| Lease { pool: self })
    }
}

/// One worker slot, given back when the link finishes.
struct Lease {
    pool: &'static Pool,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.pool.busy.fetch_sub(1, Ordering::AcqRel);
    }
}

static POOL: OnceLock<Option<Pool>> = OnceLock::new();

fn pool() -> Option<&'static Pool> {
    POOL.get_or_init(|| {
        let config = config::get();
        let mut builder = ThreadPool::builder();
        builder
            .pool_size(config.pool_size)
            .name_prefix(config.thread_name("pool-"));
        if let Some(size) = config.stack_size {
            builder.stack_size(size);
        }
        match builder.create() {
            Ok(executor) => {
                tracing::debug!(pool_size = config.pool_size, "worker pool started");
                Some(Pool {
                    executor,
                    size: config.pool_size,
                    busy: AtomicUsize::new(0),
                })
            }
            Err(err) => {
                tracing::warn!(%err, "worker pool unavailable");
                None
            }
        }
    })
    .as_ref()
}

/// Runs `job`, turning a panic into [`Error::Panicked`].
pub(crate) fn guarded<T>(job: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| Err(Error::from_panic(payload)))
}

pub(crate) fn settle<T>(producer: Producer<T>, outcome: Result<T>) {
    match outcome {
        Ok(value) => producer.resolve(value),
        Err(err) => producer.reject(err),
    }
}

/// Starts `job` under `policy` and returns the consumer of its outcome.
pub(crate) fn spawn<T, F>(policy: Launch, job: F) -> Consumer<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    match policy.strategy() {
        Strategy::Pooled(pool) => match pool.lease() {
            Some(lease) => {
                let (producer, consumer) = Producer::new();
                pool.executor.spawn_ok(async move {
                    let _lease = lease;
                    settle(producer, guarded(job))
                });
                consumer
            }
            None => {
                tracing::trace!("worker pool saturated, link gets its own thread");
                detached(job)
            }
        },
        Strategy::Deferred => Consumer::deferred(move || guarded(job)),
        Strategy::Detached => detached(job),
    }
}

fn detached<T, F>(job: F) -> Consumer<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (producer, consumer) = Producer::new();
    let builder = config::get().thread_builder("detached");
    match builder.spawn(move || settle(producer, guarded(job))) {
        // Dropping the handle detaches the thread.
        Ok(_) => {
            tracing::trace!("spawned detached link");
            consumer
        }
        Err(err) => {
            tracing::warn!(%err, "failed to spawn detached link");
            Consumer::failed(Error::Spawn(Arc::new(err)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{spawn, Launch};
    use crate::pair::Producer;
    use crate::{config, then, Error, Promise};
    use std::thread;
    use std::time::Duration;

    const ALL: [Launch; 4] = [Launch::Async, Launch::Deferred, Launch::Auto, Launch::Detached];

    #[test]
    fn test_every_policy_yields_value() {
        for policy in ALL {
            assert_eq!(spawn(policy, move || Ok(policy.to_string())).wait().unwrap(), policy.to_string());
        }
    }

    #[test]
    fn test_every_policy_stores_error() {
        for policy in ALL {
            let err = spawn::<u8, _>(policy, || Err(Error::msg("boom"))).wait().unwrap_err();
            assert_eq!(err.to_string(), "boom", "policy {policy}");
        }
    }

    #[test]
    fn test_every_policy_catches_panic() {
        for policy in ALL {
            let err = spawn::<u8, _>(policy, || panic!("link blew up")).wait().unwrap_err();
            assert!(matches!(err, Error::Panicked(ref m) if m == "link blew up"), "policy {policy}");
        }
    }

    #[test]
    fn test_deferred_runs_on_reader() {
        let consumer = spawn(Launch::Deferred, || Ok(thread::current().id()));
        assert_eq!(consumer.wait().unwrap(), thread::current().id());
    }

    #[test]
    fn test_detached_runs_on_own_thread() {
        let consumer = spawn(Launch::Detached, || {
            Ok(thread::current().name().map(str::to_owned))
        });
        let name = consumer.wait().unwrap().expect("detached threads are named");
        assert!(name.ends_with("-detached"), "{name}");
    }

    #[test]
    fn test_async_links_waiting_on_a_later_link_finish() {
        let links = config::get().pool_size + 2;
        let (producers, waiting): (Vec<_>, Vec<_>) = (0..links)
            .map(|i| {
                let (producer, consumer) = Producer::<usize>::new();
                (producer, then(consumer, move |x: usize| x + i, Launch::Async))
            })
            .unzip();
        let resolver = spawn(Launch::Async, move || {
            for producer in producers {
                producer.resolve(100);
            }
            Ok(())
        });
        for (i, link) in waiting.into_iter().enumerate() {
            let value = link.wait_timeout(Duration::from_secs(10)).expect("link finished in time");
            assert_eq!(value.unwrap(), 100 + i);
        }
        resolver.wait().unwrap();
    }

    #[test]
    fn test_parse_round_trip() {
        for policy in ALL {
            assert_eq!(policy.to_string().parse::<Launch>().unwrap(), policy);
        }
        assert_eq!(" Detached ".parse::<Launch>().unwrap(), Launch::Detached);
        assert!("eager".parse::<Launch>().is_err());
    }
}
