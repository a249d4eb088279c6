//! Test doubles for code built on `ruleline-core`.
//!
//! - [`ScriptedStore`]: a `rule.orderRule` responder that records every
//!   request and answers from a script
//! - [`RecordingNotifier`]: keeps every notice it is given
//! - [`BroadcastProbe`]: records what arrives on one topic
//! - [`siblings`]: a well-formed list of value-rule snapshots

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use ruleline_core::{
    Broadcast, BroadcastTopic, EventBus, Notice, Notifier, OrderRule, OrderRuleResponder,
    RuleNode, Subscription,
};

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReply {
    delay: Duration,
    outcome: Result<(), String>,
}

impl StoreReply {
    pub fn accept() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(()),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Err(reason.into()),
        }
    }

    /// Answer only after `delay` (use with a paused Tokio clock).
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Records requests; answers with the next scripted reply, or accepts once
/// the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    requests: Mutex<Vec<OrderRule>>,
    script: Mutex<VecDeque<StoreReply>>,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_script(replies: impl IntoIterator<Item = StoreReply>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(replies.into_iter().collect()),
        })
    }

    /// Register on `bus` as the `rule.orderRule` responder.
    pub fn install(self: &Arc<Self>, bus: &EventBus) {
        bus.respond_with(Arc::clone(self) as Arc<dyn OrderRuleResponder>);
    }

    pub fn requests(&self) -> Vec<OrderRule> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests as `(id, pos, parent)`, ignoring request ids.
    pub fn moves(&self) -> Vec<(String, usize, bool)> {
        self.requests()
            .into_iter()
            .map(|r| (r.id.to_string(), r.pos, r.parent))
            .collect()
    }
}

#[async_trait]
impl OrderRuleResponder for ScriptedStore {
    async fn order_rule(&self, request: OrderRule) -> anyhow::Result<()> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(StoreReply::accept);

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        match reply.outcome {
            Ok(()) => Ok(()),
            Err(reason) => bail!(reason),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<Notice> {
        self.notices().into_iter().filter(Notice::is_failure).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Subscribes to one topic and keeps everything delivered to it.
pub struct BroadcastProbe {
    received: Arc<Mutex<Vec<Broadcast>>>,
    _subscription: Subscription,
}

impl BroadcastProbe {
    pub fn attach(bus: &EventBus, topic: BroadcastTopic) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let subscription = bus.subscribe(topic, move |message| {
            sink.lock().unwrap().push(message.clone());
        });
        Self {
            received,
            _subscription: subscription,
        }
    }

    pub fn received(&self) -> Vec<Broadcast> {
        self.received.lock().unwrap().clone()
    }
}

/// Value-rule snapshots for `ids`, positioned in order.
pub fn siblings(ids: &[&str]) -> Vec<RuleNode> {
    ids.iter()
        .enumerate()
        .map(|(pos, id)| RuleNode::new(*id, "direct", pos, ids.len()).with_target_uri(format!("ex:{id}")))
        .collect()
}
