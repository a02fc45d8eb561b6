//! Sequential pipelines.

use crate::dispatch::Continuation;
use crate::pair::Consumer;
use crate::resolve::{Resolve, Resolved};
use crate::{then, Launch};

/// A tuple of continuations where each stage takes the resolved output of
/// the stage before it. `Shapes` collects the dispatch shape of every stage.
pub trait Waterfall<In, Shapes> {
    type Output;

    /// Chains every stage after `input`, first stage first.
    fn flow(self, input: Consumer<In>, policy: Launch) -> Consumer<Self::Output>;
}

macro_rules! waterfall_impl {
    ($first:ident $shape:ident) => {
        impl<In, $first, $shape> Waterfall<In, ($shape,)> for ($first,)
        where
            In: Resolve + Send + 'static,
            $first: Continuation<Resolved<In>, $shape> + Send + 'static,
            $first::Output: Resolve,
            Resolved<$first::Output>: Send + 'static,
        {
            type Output = Resolved<$first::Output>;

            fn flow(self, input: Consumer<In>, policy: Launch) -> Consumer<Self::Output> {
                then(input, self.0, policy)
            }
        }
    };
    ($first:ident $shape:ident $($rest:ident $rest_shape:ident)+) => {
        impl<In, $first, $shape, $($rest, $rest_shape),+> Waterfall<In, ($shape, $($rest_shape,)+)>
            for ($first, $($rest,)+)
        where
            In: Resolve + Send + 'static,
            $first: Continuation<Resolved<In>, $shape> + Send + 'static,
            $first::Output: Resolve,
            Resolved<$first::Output>: Send + 'static,
            ($($rest,)+): Waterfall<Resolved<$first::Output>, ($($rest_shape,)+)>,
        {
            type Output =
                <($($rest,)+) as Waterfall<Resolved<$first::Output>, ($($rest_shape,)+)>>::Output;

            #[allow(non_snake_case)]
            fn flow(self, input: Consumer<In>, policy: Launch) -> Consumer<Self::Output> {
                let ($first, $($rest,)+) = self;
                ($($rest,)+).flow(then(input, $first, policy), policy)
            }
        }

        waterfall_impl!($($rest $rest_shape)+);
    };
}

waterfall_impl!(A SA B SB C SC D SD E SE F SF G SG H SH);

/// Runs `tasks` one after another. The first task is called with no
/// arguments, every later one with what the previous task resolved to.
/// Each stage is its own `then` link under `policy`, so the result equals
/// the hand-written chain.
///
/// ```
/// use thenable::{waterfall, Launch};
/// let out = waterfall(
///     (|| 2_i32, |x: i32| (x, x * 3), |a: i32, b: i32| format!("{a}:{b}")),
///     Launch::Detached,
/// );
/// assert_eq!(out.wait().unwrap(), "2:6");
/// ```
pub fn waterfall<W, Shapes>(tasks: W, policy: Launch) -> Consumer<W::Output>
where
    W: Waterfall<(), Shapes>,
{
    tasks.flow(Consumer::ready(()), policy)
}
