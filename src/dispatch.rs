//! Continuation dispatch.
//!
//! A continuation receives the resolved value of its predecessor in one of
//! three shapes, picked from the parameters the continuation declares:
//!
//! * [`NoArgs`]: `FnOnce() -> R`, when the value is `()`.
//! * [`Spread`]: `FnOnce(A, B, ..) -> R`, when the value is the tuple
//!   `(A, B, ..)`. Each element becomes one positional argument.
//! * [`OneArg`]: `FnOnce(T) -> R` for any `T`, including a whole tuple.
//!
//! The shape is decided by the declared parameter list, so closure parameters
//! need their types written out. A continuation that wants a pair as one
//! value takes `|pair: (u8, u8)|`; one that wants it spread takes
//! `|a: u8, b: u8|`.

use crate::resolve::{Resolve, Resolved};
use crate::Result;

/// Zero-argument invocation.
#[derive(Debug)]
pub enum NoArgs {}

/// Single-argument invocation.
#[derive(Debug)]
pub enum OneArg {}

/// Positional invocation of a tuple's elements.
#[derive(Debug)]
pub enum Spread {}

pub trait Continuation<In, Shape> {
    type Output;

    fn call(self, input: In) -> Self::Output;
}

impl<F, R> Continuation<(), NoArgs> for F
where
    F: FnOnce() -> R,
{
    type Output = R;

    #[inline]
    fn call(self, _: ()) -> R {
        self()
    }
}

impl<F, T, R> Continuation<T, OneArg> for F
where
    F: FnOnce(T) -> R,
{
    type Output = R;

    #[inline]
    fn call(self, input: T) -> R {
        self(input)
    }
}

macro_rules! spread {
    ($($name:ident)+) => {
        impl<Func, R, $($name),+> Continuation<($($name,)+), Spread> for Func
        where
            Func: FnOnce($($name),+) -> R,
        {
            type Output = R;

            #[inline]
            #[allow(non_snake_case)]
            fn call(self, ($($name,)+): ($($name,)+)) -> R {
                self($($name),+)
            }
        }
    };
}

spread!(A);
spread!(A B);
spread!(A B C);
spread!(A B C D);
spread!(A B C D E);
spread!(A B C D E F);
spread!(A B C D E F G);
spread!(A B C D E F G H);

/// Calls `f` with `input` in its declared shape and resolves what it returns.
pub fn dispatch<In, Shape, F>(input: In, f: F) -> Result<Resolved<F::Output>>
where
    F: Continuation<In, Shape>,
    F::Output: Resolve,
{
    f.call(input).resolve()
}
