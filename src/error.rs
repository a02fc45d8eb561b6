//! Errors carried by promises and their consumers.
//!
//! Every failure that happens inside a chain link is stored in that link's
//! promise and handed to whoever reads the consumer. `Error` is `Clone` so
//! shared consumers can give the same failure to every reader.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The producer went away without resolving or rejecting.
    #[error("broken promise: producer dropped without a value")]
    ProducerDropped,

    /// An upstream step or a continuation failed with this error.
    #[error(transparent)]
    Rejected(Arc<dyn StdError + Send + Sync + 'static>),

    /// A continuation panicked; holds the panic message.
    #[error("continuation panicked: {0}")]
    Panicked(String),

    /// The consumer of this promise was already handed out.
    #[error("future already retrieved")]
    AlreadyRetrieved,

    /// The promise was already resolved or rejected.
    #[error("promise already satisfied")]
    AlreadySatisfied,

    /// The consumer no longer holds a value.
    #[error("no state: value already taken")]
    NoState,

    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(Arc<std::io::Error>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

impl Error {
    /// Wraps any error as a rejection. A crate `Error` is returned as is.
    pub fn reject<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut slot = Some(err);
        if let Some(own) = (&mut slot as &mut dyn Any)
            .downcast_mut::<Option<Error>>()
            .and_then(Option::take)
        {
            return own;
        }
        match slot {
            Some(err) => Error::Rejected(Arc::new(err)),
            None => Error::NoState,
        }
    }

    /// A rejection carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Rejected(Arc::new(Message(message.into())))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        tracing::debug!(%message, "caught panic at link boundary");
        Error::Panicked(message)
    }

    /// The original error of a rejection, if it is an `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Error::Rejected(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub fn is_broken_promise(&self) -> bool {
        matches!(self, Error::ProducerDropped)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Rejected(Arc::new(err))
    }
}
