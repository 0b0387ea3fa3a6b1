//! The Fusion configuration tree.

use crate::keys;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A scalar stored directly on a tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeValue {
    /// The explicit `null` literal — distinguishable from an unset value.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A list of prototype names; carries the linearized prototype chain
    /// at `__prototypes.<Name>.__prototypeChain`.
    Strings(Vec<String>),
}

impl TreeValue {
    /// The string payload, if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TreeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// One write against the tree, as produced by the parser.
///
/// Assignments carry a kind: writing one scalar facet clears the other two,
/// so a later `=` assignment always decides what kind of node this is while
/// keeping any children that were already configured underneath it.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `path = <scalar literal>`
    Scalar(TreeValue),
    /// `path = ${...}`
    Expression(String),
    /// `path = Vendor:Type`
    ObjectType(String),
    /// `path < source` and DSL results: the subtree is replaced wholly.
    Subtree(FusionNode),
    /// `path >`
    Unset,
}

/// One point in the configuration tree.
///
/// A node owns its children; child order is insertion order, which decides
/// the rendering order of array, tag and data-structure properties. A node
/// is *empty* iff it has no value, no expression, no object type and no
/// children — all "is this configured?" checks are emptiness checks, and a
/// missing child resolves to the canonical empty node rather than an
/// unrepresentable absence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionNode {
    pub value: Option<TreeValue>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expression: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, FusionNode>,
}

static EMPTY: LazyLock<FusionNode> = LazyLock::new(FusionNode::new);

impl FusionNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: TreeValue) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn with_expression(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            ..Self::default()
        }
    }

    pub fn with_object_type(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            ..Self::default()
        }
    }

    /// The canonical empty node.
    pub fn empty() -> &'static FusionNode {
        &EMPTY
    }

    /// A node is empty iff value is unset, expression is empty, the object
    /// type is empty and it has no children.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.expression.is_empty()
            && self.object_type.is_empty()
            && self.children.is_empty()
    }

    /// Child lookup that never fails: a missing child resolves to the
    /// canonical empty node.
    pub fn child(&self, name: &str) -> &FusionNode {
        self.children.get(name).unwrap_or(&EMPTY)
    }

    /// Walk `segments` with [`Self::child`] semantics.
    pub fn node(&self, segments: &[&str]) -> &FusionNode {
        segments.iter().fold(self, |node, segment| node.child(segment))
    }

    /// The `__meta.<name>` child.
    pub fn meta(&self, name: &str) -> &FusionNode {
        self.child(keys::META).child(name)
    }

    /// Strict path-addressed read.
    pub fn get(&self, segments: &[&str]) -> Option<&FusionNode> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.children.get(*segment))
    }

    /// The string scalar on this node, if any.
    pub fn string_value(&self) -> Option<&str> {
        self.value.as_ref().and_then(TreeValue::as_str)
    }

    /// Path-addressed write. Intermediate nodes are created on demand,
    /// except for [`Assignment::Unset`], which silently stops at the first
    /// missing segment.
    pub fn set(&mut self, segments: &[String], assignment: Assignment) {
        let Some((head, rest)) = segments.split_first() else {
            self.assign(assignment);
            return;
        };
        match assignment {
            Assignment::Unset => {
                if rest.is_empty() {
                    self.children.shift_remove(head);
                } else if let Some(child) = self.children.get_mut(head) {
                    child.set(rest, Assignment::Unset);
                }
            }
            Assignment::Subtree(subtree) if rest.is_empty() => {
                self.children.insert(head.clone(), subtree);
            }
            assignment => {
                let child = self.children.entry(head.clone()).or_default();
                child.set(rest, assignment);
            }
        }
    }

    fn assign(&mut self, assignment: Assignment) {
        match assignment {
            Assignment::Scalar(value) => {
                self.value = Some(value);
                self.expression.clear();
                self.object_type.clear();
            }
            Assignment::Expression(expression) => {
                self.value = None;
                self.expression = expression;
                self.object_type.clear();
            }
            Assignment::ObjectType(object_type) => {
                self.value = None;
                self.expression.clear();
                self.object_type = object_type;
            }
            Assignment::Subtree(subtree) => *self = subtree,
            Assignment::Unset => *self = FusionNode::new(),
        }
    }

    /// Apply cascading inheritance: fill each scalar facet from `other`
    /// only where it is unset on `self`; children present only in `other`
    /// are copied in; children present in both merge recursively. Merging
    /// never overwrites anything `self` already set.
    pub fn merge(&mut self, other: &FusionNode) {
        if self.value.is_none() {
            self.value = other.value.clone();
        }
        if self.expression.is_empty() {
            self.expression = other.expression.clone();
        }
        if self.object_type.is_empty() {
            self.object_type = other.object_type.clone();
        }
        for (key, child) in &other.children {
            match self.children.get_mut(key) {
                Some(own) => own.merge(child),
                None => {
                    self.children.insert(key.clone(), child.clone());
                }
            }
        }
    }
}
