//! Asynchronous containers recognized by the field deriver.
//!
//! [`Deferred`], [`Promise`] and [`Flow`] are the return shapes a resolver may
//! use to produce its value later. The schema only ever sees their element
//! type; the resolver bridges the container to the engine at execution time.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use tokio::sync::oneshot;

use super::value::{Handle, HostValue, ResolveStream};
use crate::error::ResolveError;

/// A lazily awaited value.
///
/// Unlike a bare future, a `Deferred` is an [`Output`](super::Output): closures
/// returning one are registered as blocking members whose value settles later.
pub struct Deferred<T> {
    future: BoxFuture<'static, T>,
}

impl<T: Send + 'static> Deferred<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: future.boxed(),
        }
    }

    /// A deferred value that is already available.
    pub fn ready(value: T) -> Self {
        Self::new(async move { value })
    }
}

impl<T> Deferred<T> {
    pub(crate) async fn wait(self) -> T {
        self.future.await
    }
}

/// A value completed from outside through its [`Completer`].
pub struct Promise<T> {
    receiver: oneshot::Receiver<T>,
}

/// The completing side of a [`Promise`].
pub struct Completer<T> {
    sender: oneshot::Sender<T>,
}

impl<T> Promise<T> {
    #[must_use]
    pub fn new() -> (Self, Completer<T>) {
        let (sender, receiver) = oneshot::channel();
        (Self { receiver }, Completer { sender })
    }

    /// A promise completed with `value`.
    pub fn completed(value: T) -> Self {
        let (promise, completer) = Self::new();
        completer.complete(value);
        promise
    }

    pub(crate) async fn wait(self) -> Result<T, ResolveError> {
        self.receiver
            .await
            .map_err(|_| ResolveError::resolver("promise dropped before completion"))
    }
}

impl<T> Completer<T> {
    /// Completes the promise. Returns `false` when the promise was dropped.
    pub fn complete(self, value: T) -> bool {
        self.sender.send(value).is_ok()
    }
}

/// A lazily produced, possibly infinite sequence of values.
pub struct Flow<T> {
    stream: BoxStream<'static, T>,
}

impl<T: Send + 'static> Flow<T> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
        }
    }

    /// A flow emitting every item of `items`.
    pub fn iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(items))
    }
}

impl<T> Stream for Flow<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.stream.poll_next_unpin(cx)
    }
}

/// A stream adapted for the engine's subscription delivery.
///
/// A publisher is cold and single-subscriber: the first call to
/// [`Publisher::subscribe`] takes the underlying stream.
#[derive(Clone)]
pub struct Publisher {
    source: Handle<ResolveStream>,
}

impl Publisher {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<HostValue, ResolveError>> + Send + 'static,
    {
        Self {
            source: Handle::new(stream.boxed()),
        }
    }

    /// A publisher emitting a single value.
    pub fn once(value: HostValue) -> Self {
        Self::new(stream::once(async move { Ok(value) }))
    }

    pub(crate) fn from_handle(source: Handle<ResolveStream>) -> Self {
        Self { source }
    }

    /// Takes the underlying stream.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Consumed`] if the publisher was already subscribed.
    pub fn subscribe(&self) -> Result<ResolveStream, ResolveError> {
        self.source.take().ok_or(ResolveError::Consumed)
    }
}
