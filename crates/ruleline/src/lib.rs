//! # Ruleline
//!
//! The interaction protocol behind one line of a hierarchical mapping-rule
//! tree: how independently rendered rule nodes keep expansion, navigation and
//! ordering consistent without a central owner of UI state.
//!
//! ## Core Concepts
//!
//! Nodes talk only through a shared [`EventBus`]:
//! - [`Broadcast`] = fire-and-forget messages every subscriber sees
//!   (`rulesView.toggle`, `ruleId.change`)
//! - [`OrderRule`] = a request with exactly one outcome (`rule.orderRule`)
//!
//! ## Architecture
//!
//! ```text
//! Rule store (responder)                 Tree (pushes snapshots)
//!     ▲                                       │
//!     │ rule.orderRule                        ▼ RuleList::apply()
//!     │                              ┌────────────────────┐
//! EventBus ◄──── publish() ───────── │ MountedRule        │
//!     │                              │  ExpansionMachine  │
//!     └──── rulesView.toggle ──────► │  .decide()         │
//!                                    └─────────┬──────────┘
//!                                              │ render()
//!                                              ▼
//!                                 RuleView (collapsed | expanded)
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Broadcasts are scoped** - `rulesView.toggle` only moves rules that are
//!    neither containers nor `object` rules
//! 2. **Navigation is not expansion** - a navigable object rule publishes
//!    `ruleId.change` and keeps its state
//! 3. **Position is the store's** - a reorder never edits `pos` locally; the
//!    next snapshot does
//! 4. **No reorder while expanded** - the menu only exists in the collapsed view
//! 5. **Subscriptions die with their node** - released on every drop path
//! 6. **Render is pure** - `(snapshot, expansion) -> RuleView`
//!
//! ## Example
//!
//! ```ignore
//! use ruleline_core::{EventBus, MountedRule, MoveTarget, RuleNode, TracingNotifier};
//! use std::sync::Arc;
//!
//! let bus = EventBus::new();
//! bus.respond_with(Arc::new(my_store));
//!
//! let node = MountedRule::mount(
//!     &bus,
//!     Arc::new(TracingNotifier),
//!     RuleNode::new("r1", "direct", 2, 5),
//! )?;
//!
//! node.click_action();                       // expand
//! bus.publish(Broadcast::RulesViewToggle { expanded: false });
//! let ticket = node.reorder(MoveTarget::Up)?; // asks for pos 1, returns at once
//! ```

// Core modules
mod bus;
mod error;
mod machine;
mod node;
mod notify;
mod render;
mod reorder;
mod request;
mod rule;
mod topic;
mod tree;



// Re-export message types
pub use topic::{Broadcast, BroadcastTopic, OrderRule, RequestId, Topic};

// Re-export bus types
pub use bus::{BusConfig, EventBus, EventBusBuilder, Subscription};

// Re-export request helpers
pub use request::{OrderRuleResponder, PendingReply, ReorderOutcome, DEFAULT_REQUEST_TIMEOUT};

// Re-export error types
pub use error::{NodeError, PropsError, ReorderFailure};

// Re-export rule snapshot types
pub use rule::{Capability, MappingTarget, RuleId, RuleNode, RuleType, ValueKind};

// Re-export machine types
pub use machine::{Expansion, ExpansionMachine, NodeEffect, NodeInput, PrimaryAction};

// Re-export node and tree types
pub use node::MountedRule;
pub use tree::{FocusTracker, RuleList};

// Re-export reorder and notice types
pub use notify::{ChannelNotifier, Notice, NoticeLevel, Notifier, TracingNotifier};
pub use reorder::{MoveTarget, ReorderTicket};

// Re-export render types
pub use render::{
    render, ActionControl, ActionIcon, ContentHint, DetailEditor, DetailView, ReorderItem,
    ReorderMenu, RuleView, SummaryView, ViewBody, AUTHOR_PLACEHOLDER, COMPLEX_SOURCE,
    EXPAND_HINT, NAVIGATE_TOOLTIP,
};

// Re-export commonly used external types
pub use async_trait::async_trait;
