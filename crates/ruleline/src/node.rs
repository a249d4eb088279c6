//! A mounted rule node.
//!
//! [`MountedRule`] owns one node's expansion machine and its bus subscription.
//! Mounting subscribes to `rulesView.toggle`; dropping the node (for any
//! reason) releases that subscription before the drop returns, so no
//! broadcast can reach a node that no longer exists.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::bus::{EventBus, Subscription};
use crate::error::{NodeError, PropsError};
use crate::machine::{Expansion, ExpansionMachine, NodeEffect, NodeInput};
use crate::notify::Notifier;
use crate::render::{render, RuleView};
use crate::reorder::{self, MoveTarget, ReorderTicket};
use crate::rule::{RuleId, RuleNode};
use crate::topic::{Broadcast, BroadcastTopic};

/// State reachable from the bus handler.
struct NodeShared {
    rule: RwLock<RuleNode>,
    machine: Mutex<ExpansionMachine>,
    expansion: watch::Sender<Expansion>,
}

impl NodeShared {
    fn step(&self, input: NodeInput) -> Option<NodeEffect> {
        let rule = self.rule.read().unwrap_or_else(PoisonError::into_inner);
        let effect = self
            .machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .decide(&rule, input);

        if let Some(NodeEffect::Transitioned(state)) = &effect {
            debug!(rule_id = %rule.id, ?input, ?state, "expansion changed");
            self.expansion.send_replace(*state);
        }
        effect
    }

    fn expansion(&self) -> Expansion {
        self.machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
    }

    fn rule(&self) -> RuleNode {
        self.rule
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct MountedRule {
    id: RuleId,
    shared: Arc<NodeShared>,
    bus: EventBus,
    notifier: Arc<dyn Notifier>,
    _toggle: Subscription,
}

impl std::fmt::Debug for MountedRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedRule")
            .field("id", &self.id)
            .field("expansion", &self.expansion())
            .finish()
    }
}

impl MountedRule {
    /// Validate `rule` and attach a collapsed node for it to `bus`.
    pub fn mount(bus: &EventBus, notifier: Arc<dyn Notifier>, rule: RuleNode) -> Result<Self, PropsError> {
        rule.validate()?;

        let (expansion, _) = watch::channel(Expansion::Collapsed);
        let id = rule.id.clone();
        let shared = Arc::new(NodeShared {
            rule: RwLock::new(rule),
            machine: Mutex::new(ExpansionMachine::new()),
            expansion,
        });

        let toggle = {
            let shared = Arc::clone(&shared);
            bus.subscribe(BroadcastTopic::RulesViewToggle, move |message| {
                if let Broadcast::RulesViewToggle { expanded } = message {
                    shared.step(NodeInput::ToggleBroadcast {
                        expanded: *expanded,
                    });
                }
            })
        };
        debug!(rule_id = %id, "mounted");

        Ok(Self {
            id,
            shared,
            bus: bus.clone(),
            notifier,
            _toggle: toggle,
        })
    }

    pub fn id(&self) -> &RuleId {
        &self.id
    }

    /// Latest snapshot.
    pub fn rule(&self) -> RuleNode {
        self.shared.rule()
    }

    pub fn expansion(&self) -> Expansion {
        self.shared.expansion()
    }

    /// Observe expansion changes, e.g. to schedule a re-render.
    pub fn watch(&self) -> watch::Receiver<Expansion> {
        self.shared.expansion.subscribe()
    }

    /// The expand/collapse/navigate control was clicked.
    pub fn click_action(&self) -> Option<NodeEffect> {
        self.interact(NodeInput::ActionClicked)
    }

    /// The summary content was clicked. Does nothing while expanded.
    pub fn click_content(&self) -> Option<NodeEffect> {
        self.interact(NodeInput::ContentClicked)
    }

    /// Accept a fresh snapshot of the same rule. Expansion is kept unless the
    /// rule became navigable, which collapses it.
    pub fn update(&self, rule: RuleNode) -> Result<(), PropsError> {
        rule.validate()?;
        if rule.id != self.id {
            warn!(expected = %self.id, got = %rule.id, "snapshot for a different rule");
            return Err(PropsError::IdentityChanged {
                expected: self.id.clone(),
                got: rule.id,
            });
        }
        *self
            .shared
            .rule
            .write()
            .unwrap_or_else(PoisonError::into_inner) = rule;
        self.shared.step(NodeInput::SnapshotReplaced);
        Ok(())
    }

    pub fn render(&self) -> RuleView {
        let rule = self.shared.rule.read().unwrap_or_else(PoisonError::into_inner);
        render(&rule, self.shared.expansion())
    }

    /// Ask the store to move this rule. Returns as soon as the request is
    /// issued; the outcome is reported through the notifier.
    ///
    /// Refused while expanded, where the reorder menu is not shown.
    pub fn reorder(&self, target: MoveTarget) -> Result<ReorderTicket, NodeError> {
        if self.expansion().is_expanded() {
            return Err(NodeError::ReorderWhileExpanded {
                id: self.id.clone(),
            });
        }
        let rule = self.shared.rule();
        Ok(reorder::issue(&self.bus, Arc::clone(&self.notifier), &rule, target)?)
    }

    /// Detach from the bus. Equivalent to dropping the node.
    pub fn unmount(self) {}

    fn interact(&self, input: NodeInput) -> Option<NodeEffect> {
        let effect = self.shared.step(input);
        if let Some(NodeEffect::Navigate(rule_id)) = &effect {
            debug!(%rule_id, "navigate");
            self.bus.publish(Broadcast::RuleIdChange {
                new_rule_id: rule_id.clone(),
            });
        }
        effect
    }
}

impl Drop for MountedRule {
    fn drop(&mut self) {
        debug!(rule_id = %self.id, "unmounting");
    }
}
