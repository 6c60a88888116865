use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Span;
use uuid::Uuid;

use crate::error::{AggregatorError, Result};

/// Per-request cancellation scope
///
/// Carries the request id used for log correlation, a cancellation token and
/// an optional deadline. Children share the id, observe the parent's
/// cancellation and never outlive the parent's deadline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Arc<str>,
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::with_request_id(Uuid::new_v4().to_string())
    }

    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Arc::from(request_id.into()),
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Child context cancelled together with this one
    pub fn child(&self) -> Self {
        Self {
            request_id: Arc::clone(&self.request_id),
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Child context that additionally expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };

        Self {
            deadline: Some(deadline),
            ..self.child()
        }
    }

    /// Cancel this context and every child derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Guard that cancels this context when dropped
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Why the context is done, if it is
    pub fn err(&self) -> Option<AggregatorError> {
        if self.token.is_cancelled() {
            return Some(AggregatorError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(AggregatorError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) -> AggregatorError {
        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = self.token.cancelled() => AggregatorError::Cancelled,
            _ = expiry => AggregatorError::DeadlineExceeded,
        }
    }

    /// Drive `fut` until it completes or the context is done
    ///
    /// The future is dropped when the context finishes first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            result = fut => result,
            err = self.done() => Err(err),
        }
    }

    /// Span for logging within this request
    pub fn span(&self) -> Span {
        tracing::info_span!("request", request_id = %self.request_id)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
