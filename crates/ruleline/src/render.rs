//! Render contract.
//!
//! [`render`] maps `(snapshot, expansion)` to a [`RuleView`]: a plain data
//! description of what a host should draw. It never mutates anything.
//!
//! The two modes are exclusive and carried by [`ViewBody`]. The reorder menu
//! only exists inside [`ViewBody::Collapsed`], so an expanded view has no way
//! to offer a move.

use crate::machine::{Expansion, PrimaryAction};
use crate::reorder::MoveTarget;
use crate::rule::{Capability, RuleId, RuleNode};

pub const COMPLEX_SOURCE: &str = "(complex mapping)";
pub const AUTHOR_PLACEHOLDER: &str = "by (unknown author)";
pub const NAVIGATE_TOOLTIP: &str = "Navigate to";
pub const EXPAND_HINT: &str = "Click to expand";

#[derive(Debug, Clone, PartialEq)]
pub struct RuleView {
    pub rule_id: RuleId,
    pub body: ViewBody,
    pub action: ActionControl,
    pub content: ContentHint,
}

impl RuleView {
    pub fn is_expanded(&self) -> bool {
        matches!(self.body, ViewBody::Expanded(_))
    }

    pub fn reorder_menu(&self) -> Option<&ReorderMenu> {
        match &self.body {
            ViewBody::Collapsed(summary) => Some(&summary.reorder),
            ViewBody::Expanded(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewBody {
    Collapsed(SummaryView),
    Expanded(DetailView),
}

/// The four summary lines plus the reorder affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    pub headline: String,
    pub type_line: String,
    pub source_line: String,
    pub author_line: String,
    pub reorder: ReorderMenu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderMenu {
    pub items: [ReorderItem; 4],
}

impl ReorderMenu {
    fn for_rule(rule: &RuleNode) -> Self {
        Self {
            items: MoveTarget::ALL.map(|target| ReorderItem {
                target,
                label: target.label(),
                pos: target.position(rule.pos, rule.count),
            }),
        }
    }

    pub fn item(&self, target: MoveTarget) -> Option<&ReorderItem> {
        self.items.iter().find(|item| item.target == target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderItem {
    pub target: MoveTarget,
    pub label: &'static str,
    pub pos: usize,
}

/// Expanded mode: hand the whole snapshot to a detail editor, read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub capability: Capability,
    pub rule: RuleNode,
    pub edit: bool,
}

impl DetailView {
    pub fn delegate<E: DetailEditor + ?Sized>(&self, editor: &E) -> E::Output {
        match self.capability {
            Capability::ObjectLike => editor.object_edit(&self.rule, self.edit),
            Capability::ValueLike => editor.value_edit(&self.rule, self.edit),
        }
    }
}

/// The two external detail views an expanded rule delegates to.
pub trait DetailEditor {
    type Output;

    fn object_edit(&self, rule: &RuleNode, edit: bool) -> Self::Output;

    fn value_edit(&self, rule: &RuleNode, edit: bool) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionIcon {
    NavigateNext,
    ExpandMore,
    ExpandLess,
}

/// The always-present action control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionControl {
    pub action: PrimaryAction,
    pub icon: ActionIcon,
    pub tooltip: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHint {
    pub clickable: bool,
    pub title: Option<&'static str>,
}

pub fn render(rule: &RuleNode, expansion: Expansion) -> RuleView {
    let action = PrimaryAction::for_rule(rule);
    let control = match (action, expansion) {
        (PrimaryAction::Navigate, _) => ActionControl {
            action,
            icon: ActionIcon::NavigateNext,
            tooltip: Some(NAVIGATE_TOOLTIP),
        },
        (PrimaryAction::Toggle, Expansion::Collapsed) => ActionControl {
            action,
            icon: ActionIcon::ExpandMore,
            tooltip: None,
        },
        (PrimaryAction::Toggle, Expansion::Expanded) => ActionControl {
            action,
            icon: ActionIcon::ExpandLess,
            tooltip: None,
        },
    };

    let (body, content) = match expansion {
        Expansion::Collapsed => (
            ViewBody::Collapsed(summary(rule)),
            ContentHint {
                clickable: true,
                title: Some(EXPAND_HINT),
            },
        ),
        Expansion::Expanded => (
            ViewBody::Expanded(DetailView {
                capability: rule.rule_type.capability(),
                rule: rule.clone(),
                edit: false,
            }),
            ContentHint {
                clickable: false,
                title: None,
            },
        ),
    };

    RuleView {
        rule_id: rule.id.clone(),
        body,
        action: control,
        content,
    }
}

fn summary(rule: &RuleNode) -> SummaryView {
    SummaryView {
        headline: rule.mapping_target.uri.clone(),
        type_line: format!("{} mapping", rule.rule_type),
        source_line: match &rule.source_path {
            Some(path) => format!("from {path}"),
            None => format!("from {COMPLEX_SOURCE}"),
        },
        author_line: AUTHOR_PLACEHOLDER.to_string(),
        reorder: ReorderMenu::for_rule(rule),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Names;

    impl DetailEditor for Names {
        type Output = String;

        fn object_edit(&self, rule: &RuleNode, edit: bool) -> String {
            format!("object:{}:{edit}", rule.id)
        }

        fn value_edit(&self, rule: &RuleNode, edit: bool) -> String {
            format!("value:{}:{edit}", rule.id)
        }
    }

    fn value_rule() -> RuleNode {
        RuleNode::new("r1", "direct", 2, 5)
            .with_target_uri("foaf:name")
            .with_source_path("name")
    }

    #[test]
    fn collapsed_summary_lines() {
        let view = render(&value_rule(), Expansion::Collapsed);
        let ViewBody::Collapsed(summary) = &view.body else {
            panic!("expected collapsed view");
        };
        assert_eq!(summary.headline, "foaf:name");
        assert_eq!(summary.type_line, "direct mapping");
        assert_eq!(summary.source_line, "from name");
        assert_eq!(summary.author_line, AUTHOR_PLACEHOLDER);
        assert!(view.content.clickable);
        assert_eq!(view.content.title, Some(EXPAND_HINT));
    }

    #[test]
    fn missing_source_path_shows_complex_placeholder() {
        let rule = RuleNode::new("r1", "complex", 0, 1);
        let view = render(&rule, Expansion::Collapsed);
        let ViewBody::Collapsed(summary) = &view.body else {
            panic!("expected collapsed view");
        };
        assert_eq!(summary.source_line, format!("from {COMPLEX_SOURCE}"));
    }

    #[test]
    fn reorder_menu_only_while_collapsed() {
        let rule = value_rule();
        let collapsed = render(&rule, Expansion::Collapsed);
        let menu = collapsed.reorder_menu().unwrap();
        let positions: Vec<_> = menu.items.iter().map(|i| (i.label, i.pos)).collect();
        assert_eq!(
            positions,
            vec![("Move to top", 0), ("Move up", 1), ("Move down", 3), ("Move to bottom", 4)]
        );

        let expanded = render(&rule, Expansion::Expanded);
        assert!(expanded.reorder_menu().is_none());
        assert!(!expanded.content.clickable);
    }

    #[test]
    fn expanded_view_delegates_by_capability() {
        let view = render(&value_rule(), Expansion::Expanded);
        let ViewBody::Expanded(detail) = &view.body else {
            panic!("expected expanded view");
        };
        assert_eq!(detail.delegate(&Names), "value:r1:false");

        let object = RuleNode::new("o1", "object", 0, 1).with_parent(true);
        let view = render(&object, Expansion::Expanded);
        let ViewBody::Expanded(detail) = &view.body else {
            panic!("expected expanded view");
        };
        assert_eq!(detail.delegate(&Names), "object:o1:false");

        let root = RuleNode::new("root", "root", 0, 1).with_parent(true);
        let ViewBody::Expanded(detail) = render(&root, Expansion::Expanded).body else {
            panic!("expected expanded view");
        };
        assert_eq!(detail.capability, Capability::ObjectLike);
    }

    #[test]
    fn action_control_per_rule_kind() {
        let object = RuleNode::new("o1", "object", 0, 1);
        let view = render(&object, Expansion::Collapsed);
        assert_eq!(view.action.icon, ActionIcon::NavigateNext);
        assert_eq!(view.action.tooltip, Some(NAVIGATE_TOOLTIP));
        assert_eq!(view.action.action, PrimaryAction::Navigate);

        let rule = value_rule();
        assert_eq!(render(&rule, Expansion::Collapsed).action.icon, ActionIcon::ExpandMore);
        assert_eq!(render(&rule, Expansion::Expanded).action.icon, ActionIcon::ExpandLess);
        assert_eq!(render(&rule, Expansion::Expanded).action.tooltip, None);
    }

    #[test]
    fn render_is_deterministic() {
        let rule = value_rule();
        assert_eq!(render(&rule, Expansion::Collapsed), render(&rule, Expansion::Collapsed));
    }
}
