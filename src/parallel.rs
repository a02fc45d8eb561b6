//! Fan-out over dedicated worker threads.
//!
//! Every task gets its producer/consumer pair before any worker starts, so
//! the returned handles are complete from the beginning. Then
//! `min(concurrency, tasks)` detached workers each walk the whole task list
//! and run every task they manage to claim. A task's claim flag flips once,
//! so each task runs on exactly one worker.

use crate::config::{self, hardware_concurrency};
use crate::launch::{self, Launch};
use crate::pair::{Consumer, Producer};
use crate::resolve::{Resolve, Resolved};
use crate::thenable::IntoThenable;
use crate::Promise;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Job = Box<dyn FnOnce() + Send>;

struct Slot {
    claimed: AtomicBool,
    job: Mutex<Option<Job>>,
}

impl Slot {
    fn new(job: Job) -> Self {
        Self {
            claimed: AtomicBool::new(false),
            job: Mutex::new(Some(job)),
        }
    }

    fn claim(&self) -> Option<Job> {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.job.lock().take()
    }
}

/// Wraps `task` into a job that settles a fresh promise, and returns the
/// promise's consumer.
fn bind<F, R>(task: F, jobs: &mut Vec<Job>) -> Consumer<Resolved<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Resolve,
    Resolved<R>: Send + 'static,
{
    let (producer, consumer) = Producer::new();
    jobs.push(Box::new(move || {
        launch::settle(producer, launch::guarded(|| task().resolve()))
    }));
    consumer
}

/// A fixed set of zero-argument tasks, one consumer per task.
pub trait TaskSet {
    type Futures;

    #[doc(hidden)]
    fn bind(self, jobs: &mut Vec<Box<dyn FnOnce() + Send>>) -> Self::Futures;
}

macro_rules! task_set {
    ($($task:ident $ret:ident)+) => {
        impl<$($task, $ret),+> TaskSet for ($($task,)+)
        where
            $(
                $task: FnOnce() -> $ret + Send + 'static,
                $ret: Resolve,
                Resolved<$ret>: Send + 'static,
            )+
        {
            type Futures = ($(Consumer<Resolved<$ret>>,)+);

            #[allow(non_snake_case)]
            fn bind(self, jobs: &mut Vec<Box<dyn FnOnce() + Send>>) -> Self::Futures {
                let ($($task,)+) = self;
                ($(bind($task, jobs),)+)
            }
        }
    };
}

task_set!(A RA);
task_set!(A RA B RB);
task_set!(A RA B RB C RC);
task_set!(A RA B RB C RC D RD);
task_set!(A RA B RB C RC D RD E RE);
task_set!(A RA B RB C RC D RD E RE F RF);
task_set!(A RA B RB C RC D RD E RE F RF G RG);
task_set!(A RA B RB C RC D RD E RE F RF G RG H RH);
task_set!(A RA B RB C RC D RD E RE F RF G RG H RH I RI);
task_set!(A RA B RB C RC D RD E RE F RF G RG H RH I RI J RJ);
task_set!(A RA B RB C RC D RD E RE F RF G RG H RH I RI J RJ K RK);
task_set!(A RA B RB C RC D RD E RE F RF G RG H RH I RI J RJ K RK L RL);

/// The consumers of a fan-out, in task order.
#[derive(Debug)]
pub struct ParallelResult<Futs> {
    pub futures: Futs,
}

impl<Futs> ParallelResult<Futs> {
    pub fn into_futures(self) -> Futs {
        self.futures
    }

    pub fn into_thenables(self) -> Futs::Thenable
    where
        Futs: IntoThenable,
    {
        self.futures.into_thenable()
    }

    /// Joins every task into one consumer, see [`crate::await_all`].
    pub fn await_all(self, policy: Launch) -> Consumer<Resolved<Futs>>
    where
        Futs: Resolve + Send + 'static,
        Resolved<Futs>: Send + 'static,
    {
        crate::await_all(self.futures, policy)
    }
}

/// Runs `tasks` on as many workers as the host has hardware threads.
pub fn parallel<T: TaskSet>(tasks: T) -> ParallelResult<T::Futures> {
    parallel_n(hardware_concurrency(), tasks)
}

/// Runs `tasks` on `min(concurrency, tasks)` dedicated worker threads.
/// A concurrency of 0 is treated as 1.
///
/// ```
/// use thenable::{parallel_n, Launch};
/// let result = parallel_n(2, (|| 1_u8, || "two", || 3.0_f64));
/// assert_eq!(result.await_all(Launch::Deferred).wait().unwrap(), (1, "two", 3.0));
/// ```
pub fn parallel_n<T: TaskSet>(concurrency: usize, tasks: T) -> ParallelResult<T::Futures> {
    let mut jobs = Vec::new();
    let futures = tasks.bind(&mut jobs);
    run(concurrency, jobs);
    ParallelResult { futures }
}

/// [`parallel_n`] over any number of tasks of one type.
pub fn parallel_iter<I, F, R>(concurrency: usize, tasks: I) -> ParallelResult<Vec<Consumer<Resolved<R>>>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> R + Send + 'static,
    R: Resolve,
    Resolved<R>: Send + 'static,
{
    let mut jobs = Vec::new();
    let futures = tasks.into_iter().map(|task| bind(task, &mut jobs)).collect();
    run(concurrency, jobs);
    ParallelResult { futures }
}

fn run(concurrency: usize, jobs: Vec<Job>) {
    if concurrency == 0 {
        tracing::debug!("parallel concurrency of 0 raised to 1");
    }
    let slots: Arc<[Slot]> = jobs.into_iter().map(Slot::new).collect();
    let workers = concurrency.max(1).min(slots.len());
    tracing::debug!(tasks = slots.len(), workers, "starting parallel workers");
    for index in 0..workers {
        let slots = slots.clone();
        let builder = config::get().thread_builder(&format!("parallel-{index}"));
        // Unclaimed jobs drop with the last slot handle, failing their
        // consumers with a broken promise.
        if let Err(err) = builder.spawn(move || work(&slots)) {
            tracing::warn!(%err, index, "failed to spawn parallel worker");
        }
    }
}

fn work(slots: &[Slot]) {
    for slot in slots {
        if let Some(job) = slot.claim() {
            job();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parallel, parallel_iter, parallel_n};
    use crate::{Error, Launch, Plain};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn counted(counter: &Arc<AtomicUsize>, value: usize) -> impl FnOnce() -> usize + Send + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            value
        }
    }

    #[test]
    fn test_more_workers_than_tasks() {
        let runs = Arc::new(AtomicUsize::new(0));
        let result = parallel_n(8, (counted(&runs, 1), counted(&runs, 2), counted(&runs, 3)));
        assert_eq!(result.await_all(Launch::Detached).wait().unwrap(), (1, 2, 3));
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_fewer_workers_than_tasks() {
        let runs = Arc::new(AtomicUsize::new(0));
        let tasks = (0..20).map(|i| counted(&runs, i));
        let futures = parallel_iter(2, tasks).into_futures();
        let values: Vec<usize> = futures.into_iter().map(|f| f.wait().unwrap()).collect();
        assert_eq!(values, (0..20).collect::<Vec<_>>());
        assert_eq!(runs.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_worker_count_is_bounded() {
        let tasks = (0..12).map(|_| || Plain(thread::current().id()));
        let ids: HashSet<_> = parallel_iter(3, tasks)
            .into_futures()
            .into_iter()
            .map(|f| f.wait().unwrap().into_inner())
            .collect();
        assert!(!ids.is_empty() && ids.len() <= 3, "{} workers", ids.len());
    }

    #[test]
    fn test_zero_concurrency_runs_one_worker() {
        let tasks = (0..4).map(|_| || thread::current().name().map(str::to_owned));
        let names: HashSet<_> = parallel_iter(0, tasks)
            .into_futures()
            .into_iter()
            .map(|f| f.wait().unwrap())
            .collect();
        assert_eq!(names.len(), 1);
        let name = names.into_iter().next().flatten().expect("workers are named");
        assert!(name.ends_with("parallel-0"), "{name}");
    }

    #[test]
    fn test_failure_is_isolated() {
        let (ok, failed, panicked) = parallel((
            || 1_u8,
            || -> Result<u8, Error> { Err(Error::msg("task 2")) },
            || -> u8 { panic!("task 3") },
        ))
        .into_futures();
        assert_eq!(ok.wait().unwrap(), 1);
        assert_eq!(failed.wait().unwrap_err().to_string(), "task 2");
        assert!(matches!(panicked.wait(), Err(Error::Panicked(_))));
    }

    #[test]
    fn test_into_thenables() {
        let (a, b) = parallel_n(2, (|| 2_i32, || 3_i32)).into_thenables();
        let sum = a.then_with(|x: i32| x * 10, Launch::Detached).wait().unwrap() + b.wait().unwrap();
        assert_eq!(sum, 23);
    }
}
