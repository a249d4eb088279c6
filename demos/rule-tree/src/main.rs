//! # Rule Tree Example
//!
//! One sibling list, one in-memory rule store, one bus. Shows the full loop:
//! a node asks to move, the store reorders and pushes fresh snapshots, the
//! list re-renders from them.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use ruleline_core::{
    ChannelNotifier, EventBus, FocusTracker, MoveTarget, OrderRule, OrderRuleResponder,
    RuleId, RuleList, RuleNode, RuleView, ViewBody,
};
use tokio::sync::mpsc;

// ============================================================================
// Store (owns rule order, pushes snapshots)
// ============================================================================

struct MemoryStore {
    order: Mutex<Vec<RuleNode>>,
    push: mpsc::UnboundedSender<Vec<RuleNode>>,
}

impl MemoryStore {
    fn snapshots(order: &[RuleNode]) -> Vec<RuleNode> {
        let count = order.len();
        order
            .iter()
            .enumerate()
            .map(|(pos, rule)| RuleNode {
                pos,
                count,
                ..rule.clone()
            })
            .collect()
    }
}

#[async_trait]
impl OrderRuleResponder for MemoryStore {
    async fn order_rule(&self, request: OrderRule) -> Result<()> {
        let snapshots = {
            let mut order = self.order.lock().unwrap_or_else(|e| e.into_inner());
            let Some(from) = order.iter().position(|r| r.id == request.id) else {
                bail!("unknown rule {}", request.id);
            };
            if request.pos >= order.len() {
                bail!("position {} is out of range", request.pos);
            }
            let rule = order.remove(from);
            order.insert(request.pos, rule);
            Self::snapshots(&order)
        };
        self.push.send(snapshots)?;
        Ok(())
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_list(views: &[RuleView]) {
    for view in views {
        match &view.body {
            ViewBody::Collapsed(summary) => println!(
                "  [{:?}] {} | {} | {}",
                view.action.icon, summary.headline, summary.type_line, summary.source_line
            ),
            ViewBody::Expanded(detail) => {
                println!("  [{:?}] {} (expanded, {:?})", view.action.icon, view.rule_id, detail.capability)
            }
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let bus = EventBus::new();
    let (notifier, mut notices) = ChannelNotifier::new();
    let (push, mut pushed) = mpsc::unbounded_channel();

    let initial = vec![
        RuleNode::new("name", "direct", 0, 3)
            .with_target_uri("foaf:name")
            .with_source_path("name"),
        RuleNode::new("label", "complex", 1, 3).with_target_uri("rdfs:label"),
        RuleNode::new("address", "object", 2, 3).with_target_uri("ex:address"),
    ];
    let store = Arc::new(MemoryStore {
        order: Mutex::new(initial.clone()),
        push,
    });
    bus.respond_with(store);

    let focus = FocusTracker::new(&bus, Some(RuleId::from("root")));
    let mut list = RuleList::new(&bus, Arc::new(notifier));
    list.apply(initial)?;
    println!("Initial:");
    print_list(&list.render());

    // Expand every value rule, then collapse again.
    list.toggle_all(true);
    println!("After expand-all:");
    print_list(&list.render());
    list.toggle_all(false);

    // Move the object rule to the top.
    let address = RuleId::from("address");
    if let Some(node) = list.get(&address) {
        let ticket = node.reorder(MoveTarget::Top)?;
        ticket.await?;
    }
    if let Some(snapshots) = pushed.recv().await {
        list.apply(snapshots)?;
    }
    while let Ok(notice) = notices.try_recv() {
        println!("notice: {}", notice.message);
    }
    println!("After move to top:");
    print_list(&list.render());

    // Navigate into it.
    if let Some(node) = list.get(&address) {
        node.click_action();
    }
    println!("Focus: {:?}", focus.current());

    Ok(())
}
