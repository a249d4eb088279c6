//! Expansion state machine.
//!
//! Pure: no IO, no bus, no locks. The node feeds it inputs together with the
//! current rule snapshot and carries out whatever [`NodeEffect`] it decides.
//!
//! ```text
//!            toggle / primary action (togglable rule)
//!   Collapsed ◄───────────────────────────────────► Expanded
//!       ▲                                              ▲
//!       └──── rulesView.toggle {expanded} (eligible) ──┘
//! ```
//!
//! Navigable object rules never change state on their primary action; it
//! yields [`NodeEffect::Navigate`] instead.

use crate::rule::{RuleId, RuleNode};

/// Whether a node shows its summary or its detail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Expansion {
    #[default]
    Collapsed,
    Expanded,
}

impl Expansion {
    pub fn from_expanded(expanded: bool) -> Self {
        if expanded {
            Expansion::Expanded
        } else {
            Expansion::Collapsed
        }
    }

    pub fn is_expanded(self) -> bool {
        self == Expansion::Expanded
    }

    pub fn toggled(self) -> Self {
        match self {
            Expansion::Collapsed => Expansion::Expanded,
            Expansion::Expanded => Expansion::Collapsed,
        }
    }
}

/// What the node's action control does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    /// Make this rule the tree's focal rule.
    Navigate,
    /// Flip local expansion.
    Toggle,
}

impl PrimaryAction {
    pub fn for_rule(rule: &RuleNode) -> Self {
        if rule.is_navigable() {
            PrimaryAction::Navigate
        } else {
            PrimaryAction::Toggle
        }
    }
}

/// Everything that can drive the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeInput {
    /// The expand/collapse/navigate control was clicked.
    ActionClicked,
    /// The summary content was clicked. Ignored while expanded.
    ContentClicked,
    /// A `rulesView.toggle` broadcast arrived.
    ToggleBroadcast { expanded: bool },
    /// A fresh snapshot replaced the rule.
    SnapshotReplaced,
}

/// What the node must do after a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEffect {
    /// Expansion changed to the given state.
    Transitioned(Expansion),
    /// Publish `ruleId.change` for this rule. State is untouched.
    Navigate(RuleId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionMachine {
    state: Expansion,
}

impl ExpansionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Expansion {
        self.state
    }

    pub fn decide(&mut self, rule: &RuleNode, input: NodeInput) -> Option<NodeEffect> {
        match input {
            NodeInput::ActionClicked => Some(self.primary(rule)),
            NodeInput::ContentClicked if self.state.is_expanded() => None,
            NodeInput::ContentClicked => Some(self.primary(rule)),
            NodeInput::ToggleBroadcast { expanded } => {
                let wanted = Expansion::from_expanded(expanded);
                if !rule.follows_toggle_broadcast() || wanted == self.state {
                    return None;
                }
                self.state = wanted;
                Some(NodeEffect::Transitioned(wanted))
            }
            // A navigable rule has no control that collapses it.
            NodeInput::SnapshotReplaced if rule.is_navigable() && self.state.is_expanded() => {
                self.state = Expansion::Collapsed;
                Some(NodeEffect::Transitioned(self.state))
            }
            NodeInput::SnapshotReplaced => None,
        }
    }

    fn primary(&mut self, rule: &RuleNode) -> NodeEffect {
        match PrimaryAction::for_rule(rule) {
            PrimaryAction::Navigate => NodeEffect::Navigate(rule.id.clone()),
            PrimaryAction::Toggle => {
                self.state = self.state.toggled();
                NodeEffect::Transitioned(self.state)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value() -> RuleNode {
        RuleNode::new("v", "value", 0, 1)
    }

    fn object() -> RuleNode {
        RuleNode::new("o", "object", 0, 1)
    }

    #[test]
    fn starts_collapsed() {
        assert_eq!(ExpansionMachine::new().state(), Expansion::Collapsed);
    }

    #[test]
    fn action_toggles_value_rules() {
        let mut m = ExpansionMachine::new();
        assert_eq!(
            m.decide(&value(), NodeInput::ActionClicked),
            Some(NodeEffect::Transitioned(Expansion::Expanded))
        );
        assert_eq!(
            m.decide(&value(), NodeInput::ActionClicked),
            Some(NodeEffect::Transitioned(Expansion::Collapsed))
        );
    }

    #[test]
    fn action_navigates_for_object_rules() {
        let mut m = ExpansionMachine::new();
        assert_eq!(
            m.decide(&object(), NodeInput::ActionClicked),
            Some(NodeEffect::Navigate("o".into()))
        );
        assert_eq!(m.state(), Expansion::Collapsed);
    }

    #[test]
    fn nested_object_toggles_instead_of_navigating() {
        let nested = object().with_parent(true);
        let mut m = ExpansionMachine::new();
        assert_eq!(
            m.decide(&nested, NodeInput::ActionClicked),
            Some(NodeEffect::Transitioned(Expansion::Expanded))
        );
    }

    #[test]
    fn content_click_only_while_collapsed() {
        let mut m = ExpansionMachine::new();
        assert_eq!(
            m.decide(&value(), NodeInput::ContentClicked),
            Some(NodeEffect::Transitioned(Expansion::Expanded))
        );
        assert_eq!(m.decide(&value(), NodeInput::ContentClicked), None);
        assert_eq!(m.state(), Expansion::Expanded);
    }

    #[test]
    fn broadcast_is_scoped_to_eligible_rules() {
        let on = NodeInput::ToggleBroadcast { expanded: true };

        let mut m = ExpansionMachine::new();
        assert_eq!(m.decide(&object(), on), None);
        assert_eq!(m.decide(&value().with_parent(true), on), None);
        assert_eq!(m.decide(&RuleNode::new("r", "root", 0, 1).with_parent(true), on), None);
        assert_eq!(m.state(), Expansion::Collapsed);

        assert_eq!(
            m.decide(&value(), on),
            Some(NodeEffect::Transitioned(Expansion::Expanded))
        );
    }

    #[test]
    fn broadcast_of_current_state_is_a_no_op() {
        let mut m = ExpansionMachine::new();
        assert_eq!(m.decide(&value(), NodeInput::ToggleBroadcast { expanded: false }), None);

        m.decide(&value(), NodeInput::ToggleBroadcast { expanded: true });
        assert_eq!(m.decide(&value(), NodeInput::ToggleBroadcast { expanded: true }), None);
        assert_eq!(m.state(), Expansion::Expanded);
    }

    #[test]
    fn snapshot_turning_navigable_collapses() {
        let mut m = ExpansionMachine::new();
        m.decide(&value(), NodeInput::ActionClicked);

        assert_eq!(m.decide(&value(), NodeInput::SnapshotReplaced), None);
        assert_eq!(
            m.decide(&object(), NodeInput::SnapshotReplaced),
            Some(NodeEffect::Transitioned(Expansion::Collapsed))
        );
        assert_eq!(m.decide(&object(), NodeInput::SnapshotReplaced), None);
    }
}
