//! Timed values.
//!
//! These only delay a resolution. Nothing else is cancelled when the
//! duration passes; racing a timeout against real work is up to the caller.

use crate::launch::{self, Launch};
use crate::pair::Consumer;
use std::thread;
use std::time::Duration;

/// Resolves to `value` once `duration` has passed.
///
/// Under [`Launch::Deferred`] the wait happens on the reading thread, so the
/// clock only starts at the first read.
pub fn timeout<T>(duration: Duration, value: T, policy: Launch) -> Consumer<T>
where
    T: Send + 'static,
{
    launch::spawn(policy, move || {
        thread::sleep(duration);
        tracing::trace!(?duration, "timeout elapsed");
        Ok(value)
    })
}

/// Completes with `()` once `duration` has passed.
pub fn delay(duration: Duration, policy: Launch) -> Consumer<()> {
    timeout(duration, (), policy)
}
