use std::future::poll_fn;
use std::task::Poll;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{AggregatorError, Result};
use crate::fetch::fetcher::{fetch, FetchOperation};
use crate::fetch::wait_group::WaitGroup;

/// How a [`FetchGroup`] collects the outcome of its dispatched fetches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Wait for every fetch, then report the error of the earliest dispatch
    #[default]
    WaitForAll,
    /// Stop at the first error to arrive, cancel the siblings and wait for them to exit
    FailFast,
}

/// Receiving end for the value of one dispatched fetch
#[derive(Debug)]
pub struct Slot<T> {
    rx: UnboundedReceiver<T>,
}

impl<T> Slot<T> {
    /// Take the delivered value after the group has joined successfully
    pub fn take(mut self) -> Result<T> {
        self.rx
            .try_recv()
            .map_err(|_| AggregatorError::Other(anyhow::anyhow!("fetch completed without delivering a value")))
    }
}

/// One fan-out batch bound to a request
///
/// Every dispatch bumps the shared wait group before spawning, so `join`
/// only returns after all fetches have reported. The group's context is a
/// child of the parent: cancelling the parent cancels the batch, and the
/// batch is cancelled when joined. Each dispatch gets its own error
/// channel, so errors are reported in dispatch order.
#[derive(Debug)]
pub struct FetchGroup {
    ctx: RequestContext,
    sub_timeout: Duration,
    policy: DrainPolicy,
    wg: WaitGroup,
    errors: Vec<UnboundedReceiver<AggregatorError>>,
}

impl FetchGroup {
    pub fn new(parent: &RequestContext, sub_timeout: Duration, policy: DrainPolicy) -> Self {
        Self {
            ctx: parent.child(),
            sub_timeout,
            policy,
            wg: WaitGroup::new(),
            errors: Vec::new(),
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn dispatched(&self) -> usize {
        self.errors.len()
    }

    /// Dispatch `op` onto its own task, delivering its value to `results`
    pub fn dispatch<T, Op>(&mut self, op: Op, results: &UnboundedSender<T>)
    where
        T: Send + 'static,
        Op: FetchOperation<T>,
    {
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        self.errors.push(errors_rx);

        self.wg.add(1);
        tokio::spawn(fetch(
            self.ctx.clone(),
            op,
            self.sub_timeout,
            self.wg.clone(),
            results.clone(),
            errors_tx,
        ));
    }

    /// Dispatch `op` with a private result channel
    pub fn spawn<T, Op>(&mut self, op: Op) -> Slot<T>
    where
        T: Send + 'static,
        Op: FetchOperation<T>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        self.dispatch(op, &tx);
        Slot { rx }
    }

    /// Wait according to the drain policy and return the first error, if any
    ///
    /// Under `WaitForAll` this is the error of the earliest dispatched fetch
    /// that failed. Under `FailFast` it is the error that stopped the batch.
    pub async fn join(self) -> Result<()> {
        let policy = self.policy;
        match self.join_inner(policy).await.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Wait for every fetch and return all errors in dispatch order
    pub async fn join_all(self) -> Vec<AggregatorError> {
        self.join_inner(DrainPolicy::WaitForAll).await
    }

    async fn join_inner(self, policy: DrainPolicy) -> Vec<AggregatorError> {
        let FetchGroup {
            ctx,
            wg,
            errors: mut receivers,
            ..
        } = self;
        let _cancel = ctx.cancel_on_drop();

        let mut errors = Vec::new();
        match policy {
            DrainPolicy::WaitForAll => wg.wait().await,
            DrainPolicy::FailFast => {
                tokio::select! {
                    err = first_error(&mut receivers) => {
                        debug!("Fetch failed, cancelling {} sibling fetches: {}", wg.pending(), err);
                        errors.push(err);
                        ctx.cancel();
                        wg.wait().await;
                    }
                    _ = wg.wait() => {}
                }
            }
        }

        // every sender has finished once the wait group is empty
        for rx in receivers.iter_mut() {
            while let Ok(err) = rx.try_recv() {
                errors.push(err);
            }
        }

        debug!("Fetch group joined: {} dispatched, {} failed", receivers.len(), errors.len());
        errors
    }
}

/// Resolves with the first error delivered on any receiver
///
/// Stays pending once every sender has closed without an error.
async fn first_error(receivers: &mut [UnboundedReceiver<AggregatorError>]) -> AggregatorError {
    poll_fn(|cx| {
        for rx in receivers.iter_mut() {
            if let Poll::Ready(Some(err)) = rx.poll_recv(cx) {
                return Poll::Ready(err);
            }
        }
        Poll::Pending
    })
    .await
}
