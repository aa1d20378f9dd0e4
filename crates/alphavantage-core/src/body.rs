//! Streamed response bodies.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::http_client::HttpError;

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;
type IoStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Async reader over a response body.
pub type BodyReader = StreamReader<IoStream, Bytes>;

/// A response body that has not been read yet.
///
/// Dropping the body releases the underlying connection.
pub struct ResponseBody {
    inner: ByteStream,
}

impl ResponseBody {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, HttpError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let chunk = (!bytes.is_empty()).then_some(Ok(bytes));
        Self::from_stream(stream::iter(chunk))
    }

    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    /// Yields `prefix` first, then the rest of `body`.
    pub fn prepend(prefix: Bytes, body: ResponseBody) -> Self {
        if prefix.is_empty() {
            return body;
        }
        Self::from_stream(stream::iter([Ok(prefix)]).chain(body))
    }

    /// Ends the stream with a cancellation error once `token` fires.
    pub fn with_cancellation(self, token: CancellationToken) -> Self {
        Self::from_stream(Cancellable {
            inner: self.inner,
            cancelled: Box::pin(token.cancelled_owned()),
            done: false,
        })
    }

    /// Reads the whole body into memory.
    pub async fn bytes(mut self) -> Result<Bytes, HttpError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    pub async fn text(self) -> Result<String, HttpError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| HttpError::body(format!("response body is not utf-8: {e}")))
    }

    pub fn into_async_read(self) -> BodyReader {
        let stream: IoStream = Box::pin(self.map_err(io::Error::other));
        StreamReader::new(stream)
    }

    /// Blocking [`std::io::Read`] adapter.
    ///
    /// Must be created inside a Tokio runtime and read from a blocking
    /// context such as [`tokio::task::spawn_blocking`].
    pub fn into_blocking_reader(self) -> SyncIoBridge<BodyReader> {
        SyncIoBridge::new(self.into_async_read())
    }
}

impl Stream for ResponseBody {
    type Item = Result<Bytes, HttpError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Debug for ResponseBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}

struct Cancellable {
    inner: ByteStream,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    done: bool,
}

impl Stream for Cancellable {
    type Item = Result<Bytes, HttpError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        if self.cancelled.as_mut().poll(cx).is_ready() {
            self.done = true;
            return Poll::Ready(Some(Err(HttpError::cancelled())));
        }
        self.inner.as_mut().poll_next(cx)
    }
}
