//! Reorder command protocol.
//!
//! A collapsed node offers four moves. Each one computes a target sibling
//! index and issues `rule.orderRule {id, pos, parent}`. The node never edits
//! its own `pos`: on success the store pushes a fresh snapshot, and that is
//! what moves the rule on screen.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bus::EventBus;
use crate::error::ReorderFailure;
use crate::notify::{Notice, Notifier};
use crate::request::ReorderOutcome;
use crate::rule::{RuleId, RuleNode};
use crate::topic::{OrderRule, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveTarget {
    Top,
    Up,
    Down,
    Bottom,
}

impl MoveTarget {
    /// Menu order.
    pub const ALL: [MoveTarget; 4] = [
        MoveTarget::Top,
        MoveTarget::Up,
        MoveTarget::Down,
        MoveTarget::Bottom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MoveTarget::Top => "Move to top",
            MoveTarget::Up => "Move up",
            MoveTarget::Down => "Move down",
            MoveTarget::Bottom => "Move to bottom",
        }
    }

    /// Sibling index this move asks for. Up/down clamp at the ends, so at a
    /// boundary they ask for the current position.
    pub fn position(self, pos: usize, count: usize) -> usize {
        let last = count.saturating_sub(1);
        match self {
            MoveTarget::Top => 0,
            MoveTarget::Up => pos.saturating_sub(1),
            MoveTarget::Down => (pos + 1).min(last),
            MoveTarget::Bottom => last,
        }
    }
}

/// A reorder request whose outcome is handled in the background.
///
/// The outcome has already been turned into a notice by the time this
/// resolves; awaiting it is optional.
#[derive(Debug)]
pub struct ReorderTicket {
    request_id: RequestId,
    rule_id: RuleId,
    pos: usize,
    task: JoinHandle<ReorderOutcome>,
}

impl ReorderTicket {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn rule_id(&self) -> &RuleId {
        &self.rule_id
    }

    /// Position that was requested.
    pub fn pos(&self) -> usize {
        self.pos
    }
}

impl Future for ReorderTicket {
    type Output = ReorderOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut()
            .task
            .poll_unpin(cx)
            .map(|joined| joined.unwrap_or(Err(ReorderFailure::ResponderGone)))
    }
}

/// Issue the move and schedule outcome handling. Never waits for the store.
pub(crate) fn issue(
    bus: &EventBus,
    notifier: Arc<dyn Notifier>,
    rule: &RuleNode,
    target: MoveTarget,
) -> Result<ReorderTicket, ReorderFailure> {
    let runtime = Handle::try_current().map_err(|_| ReorderFailure::NoRuntime)?;

    let pos = target.position(rule.pos, rule.count);
    let reply = bus.request(OrderRule::new(rule.id.clone(), pos, rule.parent));
    let request_id = reply.request_id();
    let rule_id = rule.id.clone();

    let task = {
        let rule_id = rule_id.clone();
        runtime.spawn(async move {
            let outcome = reply.await;
            match &outcome {
                Ok(()) => {
                    info!(%rule_id, %request_id, pos, "rule moved");
                    notifier.notify(Notice::moved(rule_id, request_id, target, pos));
                }
                Err(failure) => {
                    warn!(%rule_id, %request_id, pos, error = %failure, "rule move failed");
                    notifier.notify(Notice::move_failed(rule_id, request_id, failure));
                }
            }
            outcome
        })
    };

    Ok(ReorderTicket {
        request_id,
        rule_id,
        pos,
        task,
    })
}
