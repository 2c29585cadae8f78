//! Tree Views
//!
//! Derived, never-persisted shapes handed to the host's rendering layer:
//! nested [`TreeNode`] views, root-first [`Ancestor`] chains, flattened
//! [`SelectOption`] lists, and the parsed [`SubmittedParent`] form value.

use super::collection::{CollectionId, CollectionNode, ValidationError, ROOT_PARENT_ID};
use serde::{Deserialize, Serialize};

/// One node of a rendered hierarchy view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Node id, absent for the unavailable placeholder
    pub id: Option<CollectionId>,

    pub label: String,

    /// Marks the node a `full_tree` view was requested for
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub current: bool,

    /// Distance from the top of the view
    pub depth: usize,

    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(id: CollectionId, label: impl Into<String>, depth: usize) -> Self {
        Self {
            id: Some(id),
            label: label.into(),
            current: false,
            depth,
            children: Vec::new(),
        }
    }

    /// Placeholder standing in for an ancestor the viewer cannot see
    pub fn unavailable(label: impl Into<String>, depth: usize) -> Self {
        Self {
            id: None,
            label: label.into(),
            current: false,
            depth,
            children: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_none()
    }

    /// Ids in pre-order, placeholders skipped
    pub fn flatten_ids(&self) -> Vec<CollectionId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<CollectionId>) {
        if let Some(id) = self.id {
            ids.push(id);
        }
        for child in &self.children {
            child.collect_ids(ids);
        }
    }
}

/// One entry of a root-first ancestor chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Ancestor {
    /// An ancestor present in the current view
    Node(CollectionNode),
    /// An ancestor hidden from the current view or missing from storage
    Unavailable,
}

impl Ancestor {
    pub fn id(&self) -> Option<CollectionId> {
        match self {
            Ancestor::Node(node) => Some(node.id),
            Ancestor::Unavailable => None,
        }
    }

    pub fn node(&self) -> Option<&CollectionNode> {
        match self {
            Ancestor::Node(node) => Some(node),
            Ancestor::Unavailable => None,
        }
    }

    pub fn label<'a>(&'a self, untitled: &'a str, unavailable: &'a str) -> &'a str {
        match self {
            Ancestor::Node(node) => node.label(untitled),
            Ancestor::Unavailable => unavailable,
        }
    }
}

/// One entry of a flattened selection list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOption {
    pub id: CollectionId,
    pub label: String,
    pub depth: usize,
}

/// Parent choice submitted through the host's edit form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmittedParent {
    /// "No parent"
    Root,
    Parent(CollectionId),
}

impl SubmittedParent {
    /// Parse a raw form value: empty or `0` is root, a positive integer names a parent
    pub fn from_form_value(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(SubmittedParent::Root);
        }

        match trimmed.parse::<CollectionId>() {
            Ok(ROOT_PARENT_ID) => Ok(SubmittedParent::Root),
            Ok(id) => Ok(SubmittedParent::Parent(id)),
            Err(_) => Err(ValidationError::InvalidParentValue(value.to_string())),
        }
    }

    pub fn parent_id(&self) -> Option<CollectionId> {
        match self {
            SubmittedParent::Root => None,
            SubmittedParent::Parent(id) => Some(*id),
        }
    }
}

impl From<Option<CollectionId>> for SubmittedParent {
    fn from(parent: Option<CollectionId>) -> Self {
        match parent {
            Some(ROOT_PARENT_ID) | None => SubmittedParent::Root,
            Some(id) => SubmittedParent::Parent(id),
        }
    }
}
