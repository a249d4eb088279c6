//! Request/response over the bus.
//!
//! `rule.orderRule` is the only request topic. Exactly one responder (the
//! rule store) answers it. Issuing a request never blocks: the responder runs
//! as its own task and the caller gets a [`PendingReply`] that resolves to
//! exactly one terminal outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::ReorderFailure;
use crate::topic::{OrderRule, RequestId, Topic};

/// How long a request may stay unanswered before it fails with
/// [`ReorderFailure::TimedOut`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The store side of `rule.orderRule`.
///
/// Requests for the position a rule already occupies are valid and must be
/// accepted idempotently.
#[async_trait]
pub trait OrderRuleResponder: Send + Sync + 'static {
    async fn order_rule(&self, request: OrderRule) -> anyhow::Result<()>;
}

pub type ReorderOutcome = Result<(), ReorderFailure>;

/// A request in flight. Resolves once, to success or a [`ReorderFailure`].
///
/// Dropping it does not cancel the request; the store still receives it.
#[derive(Debug)]
pub struct PendingReply {
    request_id: RequestId,
    state: ReplyState,
}

#[derive(Debug)]
enum ReplyState {
    Ready(Option<ReorderOutcome>),
    Waiting(oneshot::Receiver<ReorderOutcome>),
}

impl PendingReply {
    pub(crate) fn ready(request_id: RequestId, outcome: ReorderOutcome) -> Self {
        Self {
            request_id,
            state: ReplyState::Ready(Some(outcome)),
        }
    }

    fn waiting(request_id: RequestId, rx: oneshot::Receiver<ReorderOutcome>) -> Self {
        Self {
            request_id,
            state: ReplyState::Waiting(rx),
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

impl Future for PendingReply {
    type Output = ReorderOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            // Polling again after completion reports the responder as gone.
            ReplyState::Ready(slot) => {
                Poll::Ready(slot.take().unwrap_or(Err(ReorderFailure::ResponderGone)))
            }
            ReplyState::Waiting(rx) => rx
                .poll_unpin(cx)
                .map(|received| received.unwrap_or(Err(ReorderFailure::ResponderGone))),
        }
    }
}

/// Hand `request` to `responder` on the current runtime.
pub(crate) fn dispatch_request(
    responder: Option<Arc<dyn OrderRuleResponder>>,
    request: OrderRule,
    timeout: Duration,
) -> PendingReply {
    let request_id = request.request_id;

    let Some(responder) = responder else {
        debug!(topic = %Topic::OrderRule, %request_id, "no responder registered");
        return PendingReply::ready(request_id, Err(ReorderFailure::NoResponder));
    };
    let Ok(runtime) = Handle::try_current() else {
        return PendingReply::ready(request_id, Err(ReorderFailure::NoRuntime));
    };

    debug!(
        topic = %Topic::OrderRule,
        %request_id,
        rule_id = %request.id,
        pos = request.pos,
        "dispatching request"
    );

    let (tx, rx) = oneshot::channel();
    runtime.spawn(async move {
        let outcome = match tokio::time::timeout(timeout, responder.order_rule(request)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(ReorderFailure::Rejected(format!("{err:#}"))),
            Err(_) => Err(ReorderFailure::TimedOut(timeout)),
        };
        // The caller may have stopped listening; the store has still acted.
        if tx.send(outcome).is_err() {
            debug!(%request_id, "reply dropped before outcome arrived");
        }
    });

    PendingReply::waiting(request_id, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct Accepting;

    #[async_trait]
    impl OrderRuleResponder for Accepting {
        async fn order_rule(&self, _request: OrderRule) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Refusing;

    #[async_trait]
    impl OrderRuleResponder for Refusing {
        async fn order_rule(&self, request: OrderRule) -> anyhow::Result<()> {
            bail!("position {} is locked", request.pos)
        }
    }

    struct Silent;

    #[async_trait]
    impl OrderRuleResponder for Silent {
        async fn order_rule(&self, _request: OrderRule) -> anyhow::Result<()> {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    fn request() -> OrderRule {
        OrderRule::new("r1".into(), 0, false)
    }

    #[tokio::test]
    async fn success_resolves_ok() {
        let reply = dispatch_request(Some(Arc::new(Accepting)), request(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(reply.await, Ok(()));
    }

    #[tokio::test]
    async fn store_error_becomes_rejected() {
        let reply = dispatch_request(Some(Arc::new(Refusing)), request(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(
            reply.await,
            Err(ReorderFailure::Rejected("position 0 is locked".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_responder_fails_immediately() {
        let reply = dispatch_request(None, request(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(reply.await, Err(ReorderFailure::NoResponder));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_request_times_out() {
        let timeout = Duration::from_millis(250);
        let reply = dispatch_request(Some(Arc::new(Silent)), request(), timeout);
        assert_eq!(reply.await, Err(ReorderFailure::TimedOut(timeout)));
    }

    #[test]
    fn no_runtime_is_reported_not_panicked() {
        let reply = dispatch_request(Some(Arc::new(Accepting)), request(), DEFAULT_REQUEST_TIMEOUT);
        let outcome = futures::executor::block_on(reply);
        assert_eq!(outcome, Err(ReorderFailure::NoRuntime));
    }

    #[tokio::test]
    async fn reply_carries_request_id() {
        let req = request();
        let id = req.request_id;
        let reply = dispatch_request(Some(Arc::new(Accepting)), req, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(reply.request_id(), id);
    }
}
