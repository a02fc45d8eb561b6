//! Fluent wrappers around the promise pair.
//!
//! [`Thenable`] and [`SharedThenable`] behave like the consumer they wrap
//! and add a `.then` method. [`ThenablePromise`] is a promise that hands out
//! its future on request and can be chained by reference. Conversions
//! between wrapper and native type are always explicit: [`to_thenable`] one
//! way, `into_inner` or `From` the other.

use crate::dispatch::Continuation;
use crate::pair::{Consumer, Producer};
use crate::resolve::{Resolve, Resolved};
use crate::shared::SharedConsumer;
use crate::{then, Error, Launch, Promise, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// A [`Consumer`] with a `.then` method.
///
/// ```
/// use thenable::{to_thenable, Consumer, Launch};
/// let answer = to_thenable(Consumer::ready(20_i32))
///     .then_with(|x: i32| x + 1, Launch::Deferred)
///     .then_with(|x: i32| x * 2, Launch::Detached);
/// assert_eq!(answer.wait().unwrap(), 42);
/// ```
#[derive(Debug)]
pub struct Thenable<T> {
    inner: Consumer<T>,
}

impl<T> Thenable<T> {
    pub fn new(inner: Consumer<T>) -> Self {
        Self { inner }
    }

    /// Chains `f` under the default launch policy.
    pub fn then<F, S>(self, f: F) -> Thenable<Resolved<F::Output>>
    where
        T: Resolve + Send + 'static,
        F: Continuation<Resolved<T>, S> + Send + 'static,
        F::Output: Resolve,
        Resolved<F::Output>: Send + 'static,
    {
        self.then_with(f, Launch::default())
    }

    pub fn then_with<F, S>(self, f: F, policy: Launch) -> Thenable<Resolved<F::Output>>
    where
        T: Resolve + Send + 'static,
        F: Continuation<Resolved<T>, S> + Send + 'static,
        F::Output: Resolve,
        Resolved<F::Output>: Send + 'static,
    {
        Thenable::new(then(self.inner, f, policy))
    }

    pub fn share(self) -> SharedThenable<T>
    where
        T: Clone,
    {
        SharedThenable::new(self.inner.share())
    }

    pub fn wait(self) -> Result<T> {
        self.inner.wait()
    }

    /// See [`Consumer::wait_timeout`].
    pub fn wait_timeout(self, timeout: Duration) -> std::result::Result<Result<T>, Self> {
        self.inner.wait_timeout(timeout).map_err(Thenable::new)
    }

    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    pub fn into_inner(self) -> Consumer<T> {
        self.inner
    }
}

impl<T> Future for Thenable<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T> From<Consumer<T>> for Thenable<T> {
    fn from(inner: Consumer<T>) -> Self {
        Thenable::new(inner)
    }
}

impl<T> From<Thenable<T>> for Consumer<T> {
    fn from(thenable: Thenable<T>) -> Self {
        thenable.inner
    }
}

/// A [`SharedConsumer`] with a `.then` method. Every call to `then` starts
/// an independent chain from the same value.
#[derive(Debug)]
pub struct SharedThenable<T> {
    inner: SharedConsumer<T>,
}

impl<T> SharedThenable<T> {
    pub fn new(inner: SharedConsumer<T>) -> Self {
        Self { inner }
    }

    pub fn then<F, S>(&self, f: F) -> Thenable<Resolved<F::Output>>
    where
        T: Resolve + Clone + Send + Sync + 'static,
        F: Continuation<Resolved<T>, S> + Send + 'static,
        F::Output: Resolve,
        Resolved<F::Output>: Send + 'static,
    {
        self.then_with(f, Launch::default())
    }

    pub fn then_with<F, S>(&self, f: F, policy: Launch) -> Thenable<Resolved<F::Output>>
    where
        T: Resolve + Clone + Send + Sync + 'static,
        F: Continuation<Resolved<T>, S> + Send + 'static,
        F::Output: Resolve,
        Resolved<F::Output>: Send + 'static,
    {
        Thenable::new(then(self.inner.clone(), f, policy))
    }

    pub fn wait(&self) -> Result<T>
    where
        T: Clone,
    {
        self.inner.wait()
    }

    pub fn is_ready(&self) -> bool
    where
        T: Clone,
    {
        self.inner.is_ready()
    }

    pub fn into_inner(self) -> SharedConsumer<T> {
        self.inner
    }
}

impl<T> Clone for SharedThenable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> Future for SharedThenable<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T> From<SharedConsumer<T>> for SharedThenable<T> {
    fn from(inner: SharedConsumer<T>) -> Self {
        SharedThenable::new(inner)
    }
}

impl<T> From<SharedThenable<T>> for SharedConsumer<T> {
    fn from(thenable: SharedThenable<T>) -> Self {
        thenable.inner
    }
}

/// A promise that keeps its future until asked for it.
///
/// ```
/// use thenable::{Launch, ThenablePromise};
/// let mut promise = ThenablePromise::<u32>::new();
/// let doubled = promise.then_with(|x: u32| x * 2, Launch::Deferred);
/// promise.set_value(21).unwrap();
/// assert_eq!(doubled.wait().unwrap(), 42);
/// ```
#[derive(Debug)]
pub struct ThenablePromise<T> {
    producer: Option<Producer<T>>,
    consumer: Option<Consumer<T>>,
}

impl<T> ThenablePromise<T> {
    pub fn new() -> Self {
        let (producer, consumer) = Producer::new();
        Self {
            producer: Some(producer),
            consumer: Some(consumer),
        }
    }

    /// Takes the paired future. Fails with [`Error::AlreadyRetrieved`] after
    /// the first call or after the promise was chained with `then`.
    pub fn get_future(&mut self) -> Result<Consumer<T>> {
        self.consumer.take().ok_or(Error::AlreadyRetrieved)
    }

    pub fn get_thenable_future(&mut self) -> Result<Thenable<T>> {
        self.get_future().map(Thenable::new)
    }

    pub fn set_value(&mut self, value: T) -> Result<()> {
        self.producer.take().ok_or(Error::AlreadySatisfied)?.resolve(value);
        Ok(())
    }

    pub fn set_error(&mut self, err: Error) -> Result<()> {
        self.producer.take().ok_or(Error::AlreadySatisfied)?.reject(err);
        Ok(())
    }

    /// Chains `f` on the paired future while the promise itself stays
    /// writable. Takes the future, so it can be done once.
    pub fn then<F, S>(&mut self, f: F) -> Thenable<Resolved<F::Output>>
    where
        T: Resolve + Send + 'static,
        F: Continuation<Resolved<T>, S> + Send + 'static,
        F::Output: Resolve,
        Resolved<F::Output>: Send + 'static,
    {
        self.then_with(f, Launch::default())
    }

    pub fn then_with<F, S>(&mut self, f: F, policy: Launch) -> Thenable<Resolved<F::Output>>
    where
        T: Resolve + Send + 'static,
        F: Continuation<Resolved<T>, S> + Send + 'static,
        F::Output: Resolve,
        Resolved<F::Output>: Send + 'static,
    {
        match self.get_future() {
            Ok(consumer) => Thenable::new(then(consumer, f, policy)),
            Err(err) => Thenable::new(Consumer::failed(err)),
        }
    }
}

impl<T> Default for ThenablePromise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resolve> Resolve for Thenable<T> {
    type Output = T::Output;

    fn resolve(self) -> Result<Self::Output> {
        self.inner.resolve()
    }
}

impl<T: Resolve + Clone> Resolve for SharedThenable<T> {
    type Output = T::Output;

    fn resolve(self) -> Result<Self::Output> {
        self.inner.resolve()
    }
}

/// Reads the paired future. An unsatisfied promise is dropped first, so the
/// read fails with [`Error::ProducerDropped`] instead of blocking forever.
impl<T: Resolve> Resolve for ThenablePromise<T> {
    type Output = T::Output;

    fn resolve(self) -> Result<Self::Output> {
        let ThenablePromise { producer, consumer } = self;
        drop(producer);
        consumer.ok_or(Error::AlreadyRetrieved)?.resolve()
    }
}

/// Maps a native future type to its wrapper. Wrappers map to themselves and
/// tuples map element-wise.
pub trait IntoThenable {
    type Thenable;

    fn into_thenable(self) -> Self::Thenable;
}

impl<T> IntoThenable for Consumer<T> {
    type Thenable = Thenable<T>;

    fn into_thenable(self) -> Thenable<T> {
        Thenable::new(self)
    }
}

impl<T> IntoThenable for SharedConsumer<T> {
    type Thenable = SharedThenable<T>;

    fn into_thenable(self) -> SharedThenable<T> {
        SharedThenable::new(self)
    }
}

impl<T> IntoThenable for Thenable<T> {
    type Thenable = Self;

    fn into_thenable(self) -> Self {
        self
    }
}

impl<T> IntoThenable for SharedThenable<T> {
    type Thenable = Self;

    fn into_thenable(self) -> Self {
        self
    }
}

impl<T: IntoThenable> IntoThenable for Vec<T> {
    type Thenable = Vec<T::Thenable>;

    fn into_thenable(self) -> Self::Thenable {
        self.into_iter().map(IntoThenable::into_thenable).collect()
    }
}

macro_rules! into_thenable_tuple {
    ($($name:ident)+) => {
        impl<$($name: IntoThenable),+> IntoThenable for ($($name,)+) {
            type Thenable = ($($name::Thenable,)+);

            #[allow(non_snake_case)]
            fn into_thenable(self) -> Self::Thenable {
                let ($($name,)+) = self;
                ($($name.into_thenable(),)+)
            }
        }
    };
}

into_thenable_tuple!(A);
into_thenable_tuple!(A B);
into_thenable_tuple!(A B C);
into_thenable_tuple!(A B C D);
into_thenable_tuple!(A B C D E);
into_thenable_tuple!(A B C D E F);
into_thenable_tuple!(A B C D E F G);
into_thenable_tuple!(A B C D E F G H);

pub fn to_thenable<T: IntoThenable>(value: T) -> T::Thenable {
    value.into_thenable()
}
