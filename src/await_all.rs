//! Fan-in.

use crate::launch::{self, Launch};
use crate::pair::Consumer;
use crate::resolve::{Resolve, Resolved};

/// Joins `futures` into one consumer of their resolved values.
///
/// `futures` is anything [`Resolve`]: a tuple, a `Vec`, or a nesting of
/// both. The join runs as a single link under `policy` and reads the
/// elements in index order, so when several fail, the failure with the
/// lowest index is the one surfaced.
///
/// ```
/// use thenable::{await_all, defer, Consumer, Launch};
/// let joined = await_all((Consumer::ready(1_u8), defer(|| "b"), vec![defer(|| 'c')]), Launch::Async);
/// assert_eq!(joined.wait().unwrap(), (1, "b", vec!['c']));
/// ```
pub fn await_all<J>(futures: J, policy: Launch) -> Consumer<Resolved<J>>
where
    J: Resolve + Send + 'static,
    Resolved<J>: Send + 'static,
{
    launch::spawn(policy, move || futures.resolve())
}
