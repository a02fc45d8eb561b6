//! Recursive resolution.
//!
//! [`Resolve`] is a type function: `Resolved<T>` peels one future layer per
//! impl until it reaches a type whose impl is the identity. At run time each
//! future layer costs one blocking read.
//!
//! Plain values resolve to themselves. Structural types (`Option`, `Vec`,
//! `Box`, tuples) resolve their elements in order and stop at the first
//! failure. A `Result` is a fallible layer: `Ok` keeps resolving, `Err`
//! becomes the failure.

use crate::pair::Consumer;
use crate::shared::SharedConsumer;
use crate::{Error, Result};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Resolve {
    /// The payload left after every future layer has been read.
    type Output;

    fn resolve(self) -> Result<Self::Output>;
}

/// The final payload type of a possibly nested future type.
pub type Resolved<T> = <T as Resolve>::Output;

/// Implements [`Resolve`] as the identity for the listed types, so they can
/// flow through `then` chains unchanged.
///
/// ```
/// #[derive(Debug, PartialEq)]
/// struct Celsius(f64);
/// thenable::resolve_identity!(Celsius);
///
/// use thenable::Resolve;
/// assert_eq!(Celsius(21.5).resolve().unwrap(), Celsius(21.5));
/// ```
#[macro_export]
macro_rules! resolve_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Resolve for $ty {
                type Output = $ty;

                #[inline]
                fn resolve(self) -> $crate::Result<$ty> {
                    Ok(self)
                }
            }
        )*
    };
}

resolve_identity!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &'static str,
    Duration,
    Instant,
);

/// Carries a value of any type through a chain without resolving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Plain<T>(pub T);

impl<T> Plain<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Plain<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> Resolve for Plain<T> {
    type Output = Plain<T>;

    #[inline]
    fn resolve(self) -> Result<Self> {
        Ok(self)
    }
}

impl<T: ?Sized> Resolve for Arc<T> {
    type Output = Arc<T>;

    #[inline]
    fn resolve(self) -> Result<Self> {
        Ok(self)
    }
}

impl<T: Resolve> Resolve for Consumer<T> {
    type Output = T::Output;

    fn resolve(self) -> Result<Self::Output> {
        self.wait()?.resolve()
    }
}

impl<T: Resolve + Clone> Resolve for SharedConsumer<T> {
    type Output = T::Output;

    fn resolve(self) -> Result<Self::Output> {
        self.wait()?.resolve()
    }
}

impl<T, E> Resolve for std::result::Result<T, E>
where
    T: Resolve,
    E: StdError + Send + Sync + 'static,
{
    type Output = T::Output;

    fn resolve(self) -> Result<Self::Output> {
        self.map_err(Error::reject)?.resolve()
    }
}

impl<T: Resolve> Resolve for Option<T> {
    type Output = Option<T::Output>;

    fn resolve(self) -> Result<Self::Output> {
        self.map(Resolve::resolve).transpose()
    }
}

impl<T: Resolve> Resolve for Box<T> {
    type Output = T::Output;

    fn resolve(self) -> Result<Self::Output> {
        (*self).resolve()
    }
}

impl<T: Resolve> Resolve for Vec<T> {
    type Output = Vec<T::Output>;

    fn resolve(self) -> Result<Self::Output> {
        self.into_iter().map(Resolve::resolve).collect()
    }
}

macro_rules! resolve_tuple {
    ($($name:ident)+) => {
        impl<$($name: Resolve),+> Resolve for ($($name,)+) {
            type Output = ($($name::Output,)+);

            #[allow(non_snake_case)]
            fn resolve(self) -> Result<Self::Output> {
                let ($($name,)+) = self;
                Ok(($($name.resolve()?,)+))
            }
        }
    };
}

resolve_tuple!(A);
resolve_tuple!(A B);
resolve_tuple!(A B C);
resolve_tuple!(A B C D);
resolve_tuple!(A B C D E);
resolve_tuple!(A B C D E F);
resolve_tuple!(A B C D E F G);
resolve_tuple!(A B C D E F G H);
resolve_tuple!(A B C D E F G H I);
resolve_tuple!(A B C D E F G H I J);
resolve_tuple!(A B C D E F G H I J K);
resolve_tuple!(A B C D E F G H I J K L);

#[cfg(test)]
mod tests {
    use super::{Plain, Resolve};
    use crate::pair::{Consumer, Producer};
    use crate::{Error, Promise};
    use std::io;
    use std::thread;

    fn resolves_to<T: Resolve<Output = O>, O>() {}

    #[test]
    fn test_type_function_depths() {
        resolves_to::<i32, i32>();
        resolves_to::<Consumer<i32>, i32>();
        resolves_to::<Consumer<Consumer<i32>>, i32>();
        resolves_to::<Consumer<Consumer<Consumer<i32>>>, i32>();
        resolves_to::<Consumer<()>, ()>();
        resolves_to::<(Consumer<u8>, String), (u8, String)>();
        resolves_to::<Result<Consumer<u8>, io::Error>, u8>();
    }

    #[test]
    fn test_identity() {
        assert_eq!(5_i32.resolve().unwrap(), 5);
        assert_eq!(String::from("x").resolve().unwrap(), "x");
        let () = ().resolve().unwrap();
        assert_eq!(Plain(vec![1, 2]).resolve().unwrap(), Plain(vec![1, 2]));
    }

    #[test]
    fn test_nested_depth_three() {
        let (p3, c3) = Producer::<i32>::new();
        let (p2, c2) = Producer::<Consumer<i32>>::new();
        let (p1, c1) = Producer::<Consumer<Consumer<i32>>>::new();
        let task = thread::spawn(move || {
            p1.resolve(c2);
            p2.resolve(c3);
            p3.resolve(7);
        });
        assert_eq!(c1.resolve().unwrap(), 7);
        task.join().expect("The task thread has panicked");
    }

    #[test]
    fn test_inner_failure_propagates() {
        let (p2, c2) = Producer::<i32>::new();
        let outer = Consumer::ready(c2);
        drop(p2);
        assert!(outer.resolve().unwrap_err().is_broken_promise());
    }

    #[test]
    fn test_result_layer() {
        let ok: Result<Consumer<u8>, io::Error> = Ok(Consumer::ready(1));
        assert_eq!(ok.resolve().unwrap(), 1);
        let err: Result<u8, io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = err.resolve().unwrap_err();
        assert_eq!(err.downcast_ref::<io::Error>().unwrap().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_tuple_stops_at_first_failure() {
        let tuple = (
            Consumer::ready(1_u8),
            Consumer::<u8>::failed(Error::msg("first")),
            Consumer::<u8>::failed(Error::msg("second")),
        );
        assert_eq!(tuple.resolve().unwrap_err().to_string(), "first");
    }

    #[test]
    fn test_vec_and_option() {
        let futures = vec![Consumer::ready(1_u8), Consumer::ready(2_u8)];
        assert_eq!(futures.resolve().unwrap(), vec![1, 2]);
        assert_eq!(Some(Consumer::ready('a')).resolve().unwrap(), Some('a'));
        assert_eq!(None::<Consumer<char>>.resolve().unwrap(), None);
    }
}
