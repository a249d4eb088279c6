//! Sibling lists and the focal rule.
//!
//! [`RuleList`] is the piece of the tree that turns pushed snapshots into
//! mounted nodes. [`FocusTracker`] is the consumer of `ruleId.change`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::bus::{EventBus, Subscription};
use crate::error::PropsError;
use crate::node::MountedRule;
use crate::notify::Notifier;
use crate::render::RuleView;
use crate::rule::{RuleId, RuleNode};
use crate::topic::{Broadcast, BroadcastTopic};

/// The mounted nodes for one list of siblings, in display order.
pub struct RuleList {
    bus: EventBus,
    notifier: Arc<dyn Notifier>,
    nodes: Vec<MountedRule>,
}

impl RuleList {
    pub fn new(bus: &EventBus, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            bus: bus.clone(),
            notifier,
            nodes: Vec::new(),
        }
    }

    /// Reconcile against a freshly pushed sibling list.
    ///
    /// Nodes whose id is still present keep their expansion and receive the
    /// new snapshot; new ids are mounted collapsed; missing ids are unmounted.
    /// The whole push is validated first and rejected as a unit.
    pub fn apply(&mut self, snapshots: Vec<RuleNode>) -> Result<(), PropsError> {
        let mut seen = HashSet::with_capacity(snapshots.len());
        for rule in &snapshots {
            rule.validate()?;
            if !seen.insert(rule.id.clone()) {
                return Err(PropsError::DuplicateId {
                    id: rule.id.clone(),
                });
            }
            if rule.count != snapshots.len() {
                warn!(rule_id = %rule.id, count = rule.count, siblings = snapshots.len(), "sibling count disagrees with list");
            }
        }

        let mut existing: HashMap<RuleId, MountedRule> = self
            .nodes
            .drain(..)
            .map(|node| (node.id().clone(), node))
            .collect();

        let mut nodes = Vec::with_capacity(snapshots.len());
        for rule in snapshots {
            let node = match existing.remove(&rule.id) {
                Some(node) => {
                    node.update(rule)?;
                    node
                }
                None => MountedRule::mount(&self.bus, Arc::clone(&self.notifier), rule)?,
            };
            nodes.push(node);
        }

        if !existing.is_empty() {
            debug!(removed = existing.len(), "unmounting rules no longer listed");
        }
        // Dropping the leftovers releases their subscriptions.
        drop(existing);

        self.nodes = nodes;
        Ok(())
    }

    pub fn get(&self, id: &RuleId) -> Option<&MountedRule> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountedRule> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> Vec<RuleId> {
        self.nodes.iter().map(|node| node.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn render(&self) -> Vec<RuleView> {
        self.nodes.iter().map(MountedRule::render).collect()
    }

    /// Expand or collapse every eligible rule on the bus.
    pub fn toggle_all(&self, expanded: bool) {
        self.bus.publish(Broadcast::RulesViewToggle { expanded });
    }
}

/// Follows `ruleId.change` and remembers the tree's focal rule.
pub struct FocusTracker {
    focus: Arc<watch::Sender<Option<RuleId>>>,
    _subscription: Subscription,
}

impl FocusTracker {
    pub fn new(bus: &EventBus, initial: Option<RuleId>) -> Self {
        let (focus, _) = watch::channel(initial);
        let focus = Arc::new(focus);
        let subscription = {
            let focus = Arc::clone(&focus);
            bus.subscribe(BroadcastTopic::RuleIdChange, move |message| {
                if let Broadcast::RuleIdChange { new_rule_id } = message {
                    debug!(rule_id = %new_rule_id, "focus changed");
                    focus.send_replace(Some(new_rule_id.clone()));
                }
            })
        };
        Self {
            focus,
            _subscription: subscription,
        }
    }

    pub fn current(&self) -> Option<RuleId> {
        self.focus.borrow().clone()
    }

    pub fn changes(&self) -> watch::Receiver<Option<RuleId>> {
        self.focus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Expansion;
    use crate::notify::TracingNotifier;

    fn list(bus: &EventBus) -> RuleList {
        RuleList::new(bus, Arc::new(TracingNotifier))
    }

    fn siblings(ids: &[&str]) -> Vec<RuleNode> {
        ids.iter()
            .enumerate()
            .map(|(pos, id)| RuleNode::new(*id, "value", pos, ids.len()))
            .collect()
    }

    #[test]
    fn apply_mounts_in_order() {
        let bus = EventBus::new();
        let mut rules = list(&bus);
        rules.apply(siblings(&["a", "b", "c"])).unwrap();

        assert_eq!(rules.ids(), vec![RuleId::from("a"), RuleId::from("b"), RuleId::from("c")]);
        assert_eq!(bus.subscriber_count(BroadcastTopic::RulesViewToggle), 3);
    }

    #[test]
    fn reapply_keeps_state_and_unmounts_removed() {
        let bus = EventBus::new();
        let mut rules = list(&bus);
        rules.apply(siblings(&["a", "b", "c"])).unwrap();
        rules.get(&"b".into()).unwrap().click_action();

        rules.apply(siblings(&["b", "a"])).unwrap();

        assert_eq!(rules.ids(), vec![RuleId::from("b"), RuleId::from("a")]);
        let b = rules.get(&"b".into()).unwrap();
        assert_eq!(b.expansion(), Expansion::Expanded);
        assert_eq!(b.rule().pos, 0);
        assert_eq!(bus.subscriber_count(BroadcastTopic::RulesViewToggle), 2);
    }

    #[test]
    fn duplicate_ids_rejected_without_touching_nodes() {
        let bus = EventBus::new();
        let mut rules = list(&bus);
        rules.apply(siblings(&["a", "b"])).unwrap();

        let err = rules.apply(siblings(&["a", "a"])).unwrap_err();
        assert_eq!(err, PropsError::DuplicateId { id: "a".into() });
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn toggle_all_reaches_every_eligible_node() {
        let bus = EventBus::new();
        let mut rules = list(&bus);
        let mut snapshots = siblings(&["a", "b"]);
        snapshots[1].parent = true;
        rules.apply(snapshots).unwrap();

        rules.toggle_all(true);
        let states: Vec<_> = rules.iter().map(MountedRule::expansion).collect();
        assert_eq!(states, vec![Expansion::Expanded, Expansion::Collapsed]);
        assert_eq!(rules.render().iter().filter(|v| v.is_expanded()).count(), 1);
    }

    #[test]
    fn focus_tracker_follows_navigation() {
        let bus = EventBus::new();
        let focus = FocusTracker::new(&bus, Some("root".into()));
        let mut rules = list(&bus);
        rules
            .apply(vec![RuleNode::new("r2", "object", 0, 1)])
            .unwrap();

        assert_eq!(focus.current(), Some("root".into()));
        rules.get(&"r2".into()).unwrap().click_action();
        assert_eq!(focus.current(), Some("r2".into()));
    }
}
