//! Blocking reads on the calling thread.
//!
//! Worker threads of the pool run inside a `futures` executor, where
//! `futures::executor::block_on` refuses to nest. Links still have to block
//! on their predecessor, so reads park the current thread and are woken
//! through an `ArcWake` handle instead.

use futures::task::{waker, ArcWake};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, Thread};
use std::time::Instant;

struct ThreadNotify {
    thread: Thread,
}

impl ArcWake for ThreadNotify {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.thread.unpark();
    }
}

pub(crate) fn block_on<F: Future + Unpin>(mut fut: F) -> F::Output {
    let waker = waker(Arc::new(ThreadNotify {
        thread: thread::current(),
    }));
    let mut cx = Context::from_waker(&waker);
    loop {
        if let Poll::Ready(out) = Pin::new(&mut fut).poll(&mut cx) {
            return out;
        }
        thread::park();
    }
}

/// Polls `fut` until it completes or `deadline` passes. Returns the future
/// back when time runs out.
pub(crate) fn block_until<F: Future + Unpin>(mut fut: F, deadline: Instant) -> Result<F::Output, F> {
    let waker = waker(Arc::new(ThreadNotify {
        thread: thread::current(),
    }));
    let mut cx = Context::from_waker(&waker);
    loop {
        if let Poll::Ready(out) = Pin::new(&mut fut).poll(&mut cx) {
            return Ok(out);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(fut);
        }
        thread::park_timeout(deadline - now);
    }
}
