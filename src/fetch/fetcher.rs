use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::context::RequestContext;
use crate::error::{AggregatorError, Result};
use crate::fetch::wait_group::WaitGroup;

/// A single lookup against one backing source
///
/// Implemented for any `FnOnce(RequestContext) -> impl Future<Output = Result<T>>`.
/// The context passed in is already bounded by the sub-timeout.
pub trait FetchOperation<T>: Send + 'static {
    type Future: Future<Output = Result<T>> + Send + 'static;

    fn fetch(self, ctx: RequestContext) -> Self::Future;
}

impl<T, F, Fut> FetchOperation<T> for F
where
    F: FnOnce(RequestContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    type Future = Fut;

    fn fetch(self, ctx: RequestContext) -> Fut {
        self(ctx)
    }
}

/// Run one fetch operation bounded by `sub_timeout`
///
/// Exactly one message is sent, to `results` on success or to `errors`
/// otherwise (including expiry, cancellation and panics), and `wg` is
/// released exactly once after that send. The caller must have called
/// `wg.add(1)` before dispatching.
///
/// The release guard is taken before the future is built, so a future that
/// is dropped or aborted without ever being polled still releases `wg`.
pub fn fetch<T, Op>(
    parent: RequestContext,
    op: Op,
    sub_timeout: Duration,
    wg: WaitGroup,
    results: UnboundedSender<T>,
    errors: UnboundedSender<AggregatorError>,
) -> impl Future<Output = ()> + Send + 'static
where
    T: Send + 'static,
    Op: FetchOperation<T>,
{
    let release = wg.release_on_drop();

    async move {
        let _release = release;

        let ctx = parent.with_timeout(sub_timeout);
        let _cancel = ctx.cancel_on_drop();

        let outcome = AssertUnwindSafe(ctx.run(op.fetch(ctx.clone())))
            .catch_unwind()
            .await;

        // a closed receiver means the orchestrator stopped listening
        match outcome {
            Ok(Ok(value)) => {
                let _ = results.send(value);
            }
            Ok(Err(err)) => {
                let _ = errors.send(err);
            }
            Err(panic) => {
                let _ = errors.send(AggregatorError::TaskPanicked(panic_message(panic.as_ref())));
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
