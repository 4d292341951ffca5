//! Off-request execution of mutating operations.
//!
//! `make_async` spawns the unit of work on the Tokio runtime and hands back a
//! [`RestResult`] immediately. Awaiting the handle yields the outcome; the
//! caller owns timeouts and may [`abort`](RestResult::abort) it.

use crate::error::ApiError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// Handle to a dispatched operation.
#[derive(Debug)]
pub struct RestResult<T> {
    handle: JoinHandle<Result<T, ApiError>>,
}

/// Runs `work` on a spawned task.
///
/// Must be called from within a Tokio runtime.
pub fn make_async<T, F>(work: F) -> RestResult<T>
where
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
    T: Send + 'static,
{
    RestResult {
        handle: tokio::spawn(work),
    }
}

impl<T> RestResult<T> {
    /// Cancels the operation. Awaiting afterwards yields [`ApiError::Cancelled`]
    /// unless the work already finished.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Whether the operation has run to completion (or was cancelled)
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Future for RestResult<T> {
    type Output = Result<T, ApiError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_cancelled() => Poll::Ready(Err(ApiError::Cancelled)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(ApiError::TaskFailed(e.to_string()))),
        }
    }
}
