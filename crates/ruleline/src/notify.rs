//! User-visible feedback for reorder outcomes.
//!
//! Notices are fire-and-forget: a [`Notifier`] must not block, and whatever
//! presents them (a toast, a status line) lives outside this crate.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::ReorderFailure;
use crate::reorder::MoveTarget;
use crate::rule::RuleId;
use crate::topic::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub rule_id: RuleId,
    pub request_id: RequestId,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub(crate) fn moved(rule_id: RuleId, request_id: RequestId, target: MoveTarget, pos: usize) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: format!("Rule {rule_id}: {} (position {})", target.label().to_lowercase(), pos + 1),
            rule_id,
            request_id,
            at: Utc::now(),
        }
    }

    pub(crate) fn move_failed(rule_id: RuleId, request_id: RequestId, failure: &ReorderFailure) -> Self {
        Self {
            level: NoticeLevel::Failure,
            message: format!("Rule {rule_id} could not be moved: {failure}"),
            rule_id,
            request_id,
            at: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.level == NoticeLevel::Failure
    }
}

pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}

/// Forwards notices to a receiver the host drains on its own schedule.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if let Err(err) = self.tx.send(notice) {
            warn!(rule_id = %err.0.rule_id, "notice receiver closed, dropping notice");
        }
    }
}

/// Reports notices through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => {
                info!(rule_id = %notice.rule_id, request_id = %notice.request_id, "{}", notice.message)
            }
            NoticeLevel::Failure => {
                warn!(rule_id = %notice.rule_id, request_id = %notice.request_id, "{}", notice.message)
            }
        }
    }
}
