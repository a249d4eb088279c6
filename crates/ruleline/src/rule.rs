//! The rule snapshot a node renders.
//!
//! A [`RuleNode`] is an immutable, externally owned view of one mapping rule at
//! one point in time. The tree pushes a fresh snapshot whenever the store's
//! data changes; nodes never edit it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PropsError;

/// Identity of a rule, unique among its siblings and ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RuleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Rule type discriminator.
///
/// `object` and `root` hold nested rules; every other string names a kind of
/// value rule and is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleType {
    Object,
    Root,
    Value(ValueKind),
}

/// Name of a value-rule kind such as `direct` or `complex`.
///
/// Only built by [`RuleType::from`], which routes `object` and `root` to
/// their own variants, so a `ValueKind` never carries either name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueKind(String);

impl ValueKind {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RuleType {
    pub fn as_str(&self) -> &str {
        match self {
            RuleType::Object => "object",
            RuleType::Root => "root",
            RuleType::Value(kind) => kind.as_str(),
        }
    }

    pub fn is_object(&self) -> bool {
        self.as_str() == "object"
    }

    /// Which detail editor this type delegates to when expanded.
    pub fn capability(&self) -> Capability {
        match self.as_str() {
            "object" | "root" => Capability::ObjectLike,
            _ => Capability::ValueLike,
        }
    }
}

impl From<String> for RuleType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "object" => RuleType::Object,
            "root" => RuleType::Root,
            _ => RuleType::Value(ValueKind(raw)),
        }
    }
}

impl From<&str> for RuleType {
    fn from(raw: &str) -> Self {
        RuleType::from(raw.to_string())
    }
}

impl From<RuleType> for String {
    fn from(ty: RuleType) -> Self {
        match ty {
            RuleType::Object => "object".to_string(),
            RuleType::Root => "root".to_string(),
            RuleType::Value(kind) => kind.0,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detail-editor family, resolved once from the type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ObjectLike,
    ValueLike,
}

/// Where a rule writes to. Only `uri` is interpreted here; the rest is passed
/// through to the detail editors untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingTarget {
    #[serde(default)]
    pub uri: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MappingTarget {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            extra: Map::new(),
        }
    }
}

/// One rule as the tree hands it to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleNode {
    pub id: RuleId,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    /// True when this rule itself contains nested rules.
    #[serde(default)]
    pub parent: bool,
    #[serde(default)]
    pub mapping_target: MappingTarget,
    /// Absent for complex rules that have no single source path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    pub pos: usize,
    pub count: usize,

    // Pass-through for the detail editors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_rules: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_rule: Option<Value>,
}

impl RuleNode {
    /// Minimal snapshot; everything optional is left empty.
    pub fn new(id: impl Into<RuleId>, rule_type: impl Into<RuleType>, pos: usize, count: usize) -> Self {
        Self {
            id: id.into(),
            rule_type: rule_type.into(),
            parent: false,
            mapping_target: MappingTarget::default(),
            source_path: None,
            pos,
            count,
            comment: None,
            type_rules: Vec::new(),
            target_property: None,
            pattern: None,
            uri_rule: None,
        }
    }

    pub fn with_parent(mut self, parent: bool) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_target_uri(mut self, uri: impl Into<String>) -> Self {
        self.mapping_target.uri = uri.into();
        self
    }

    /// Check the snapshot's preconditions: non-empty id, `count >= 1`,
    /// `pos < count`.
    pub fn validate(&self) -> Result<(), PropsError> {
        if self.id.as_str().is_empty() {
            return Err(PropsError::EmptyId);
        }
        if self.count == 0 {
            return Err(PropsError::EmptyCount {
                id: self.id.clone(),
            });
        }
        if self.pos >= self.count {
            return Err(PropsError::PositionOutOfRange {
                id: self.id.clone(),
                pos: self.pos,
                count: self.count,
            });
        }
        Ok(())
    }

    /// Object rules that are not themselves nested navigate instead of expanding.
    pub fn is_navigable(&self) -> bool {
        self.rule_type.is_object() && !self.parent
    }

    /// Whether a `rulesView.toggle` broadcast applies to this rule.
    pub fn follows_toggle_broadcast(&self) -> bool {
        !self.parent && !self.rule_type.is_object()
    }

    pub fn last_pos(&self) -> usize {
        self.count.saturating_sub(1)
    }
}
