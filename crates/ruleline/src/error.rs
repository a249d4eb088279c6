//! Error types.
//!
//! Three families, scoped to the thing that failed:
//! - [`PropsError`]: the caller handed a node a malformed snapshot. This is a
//!   contract violation and is rejected at the boundary.
//! - [`ReorderFailure`]: a `rule.orderRule` request did not succeed. Recovered
//!   locally by surfacing a notice, never retried.
//! - [`NodeError`]: an interaction the node cannot perform in its current state.

use std::time::Duration;

use thiserror::Error;

use crate::rule::RuleId;

/// A rule snapshot violated its preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropsError {
    #[error("rule id must not be empty")]
    EmptyId,

    #[error("rule {id}: sibling count must be at least 1")]
    EmptyCount { id: RuleId },

    #[error("rule {id}: position {pos} is outside 0..{count}")]
    PositionOutOfRange { id: RuleId, pos: usize, count: usize },

    #[error("rule {id} appears more than once among its siblings")]
    DuplicateId { id: RuleId },

    #[error("snapshot for rule {got} pushed into node {expected}")]
    IdentityChanged { expected: RuleId, got: RuleId },
}

/// Terminal failure outcome of a `rule.orderRule` request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderFailure {
    #[error("no rule store is answering reorder requests")]
    NoResponder,

    #[error("rule store did not answer within {0:?}")]
    TimedOut(Duration),

    #[error("rule store went away before answering")]
    ResponderGone,

    #[error("rule store rejected the move: {0}")]
    Rejected(String),

    #[error("reorder requests need a running async runtime")]
    NoRuntime,
}

/// An interaction was refused by the node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("rule {id} cannot be reordered while expanded")]
    ReorderWhileExpanded { id: RuleId },

    #[error(transparent)]
    Props(#[from] PropsError),

    #[error(transparent)]
    Reorder(#[from] ReorderFailure),
}
