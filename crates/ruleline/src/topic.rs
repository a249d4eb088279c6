//! Topic catalog.
//!
//! The bus carries exactly three kinds of message:
//!
//! | topic              | shape            | payload                   |
//! |--------------------|------------------|---------------------------|
//! | `rulesView.toggle` | broadcast        | `{expanded}`              |
//! | `ruleId.change`    | broadcast        | `{newRuleId}`             |
//! | `rule.orderRule`   | request/response | `{id, pos, parent}` → ok/err |
//!
//! Broadcasts are modelled as one tagged union ([`Broadcast`]) so a handler
//! can never receive a payload from a topic it did not subscribe to.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::RuleId;

/// Every topic the bus knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    RulesViewToggle,
    RuleIdChange,
    OrderRule,
}

impl Topic {
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::RulesViewToggle => "rulesView.toggle",
            Topic::RuleIdChange => "ruleId.change",
            Topic::OrderRule => "rule.orderRule",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topics that can be subscribed to (the broadcast half of the catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastTopic {
    RulesViewToggle,
    RuleIdChange,
}

impl BroadcastTopic {
    pub const fn topic(self) -> Topic {
        match self {
            BroadcastTopic::RulesViewToggle => Topic::RulesViewToggle,
            BroadcastTopic::RuleIdChange => Topic::RuleIdChange,
        }
    }
}

impl fmt::Display for BroadcastTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic().as_str())
    }
}

/// A fire-and-forget message delivered to every subscriber of its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "data")]
pub enum Broadcast {
    /// Ask every eligible rule to adopt `expanded`.
    #[serde(rename = "rulesView.toggle")]
    RulesViewToggle { expanded: bool },

    /// The tree's focal rule should become `new_rule_id`.
    #[serde(rename = "ruleId.change")]
    RuleIdChange {
        #[serde(rename = "newRuleId")]
        new_rule_id: RuleId,
    },
}

impl Broadcast {
    pub fn topic(&self) -> BroadcastTopic {
        match self {
            Broadcast::RulesViewToggle { .. } => BroadcastTopic::RulesViewToggle,
            Broadcast::RuleIdChange { .. } => BroadcastTopic::RuleIdChange,
        }
    }
}

/// Correlates a `rule.orderRule` request with its outcome in logs and notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Payload of `rule.orderRule`: move rule `id` to sibling index `pos`.
///
/// `parent` is the moving rule's own container flag, forwarded as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRule {
    #[serde(skip, default)]
    pub request_id: RequestId,
    pub id: RuleId,
    pub pos: usize,
    pub parent: bool,
}

impl OrderRule {
    pub fn new(id: RuleId, pos: usize, parent: bool) -> Self {
        Self {
            request_id: RequestId::new(),
            id,
            pos,
            parent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_match_catalog() {
        assert_eq!(Topic::RulesViewToggle.as_str(), "rulesView.toggle");
        assert_eq!(Topic::RuleIdChange.as_str(), "ruleId.change");
        assert_eq!(Topic::OrderRule.as_str(), "rule.orderRule");
        assert_eq!(BroadcastTopic::RuleIdChange.to_string(), "ruleId.change");
    }

    #[test]
    fn broadcast_knows_its_topic() {
        let msg = Broadcast::RulesViewToggle { expanded: true };
        assert_eq!(msg.topic(), BroadcastTopic::RulesViewToggle);

        let msg = Broadcast::RuleIdChange {
            new_rule_id: "r2".into(),
        };
        assert_eq!(msg.topic(), BroadcastTopic::RuleIdChange);
    }

    #[test]
    fn broadcast_wire_shape() {
        let json = serde_json::to_value(Broadcast::RuleIdChange {
            new_rule_id: "r2".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"topic": "ruleId.change", "data": {"newRuleId": "r2"}})
        );
    }

    #[test]
    fn order_rule_payload_omits_request_id() {
        let json = serde_json::to_value(OrderRule::new("r1".into(), 1, false)).unwrap();
        assert_eq!(json, serde_json::json!({"id": "r1", "pos": 1, "parent": false}));
    }
}
