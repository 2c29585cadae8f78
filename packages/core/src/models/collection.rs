//! Collection Hierarchy Data Structures
//!
//! Typed records for the single-parent collection hierarchy:
//!
//! - [`CollectionRecord`] - the host's view of a collection (id, title, public flag)
//! - [`TreeEdge`] - one persisted `collection_trees` row (at most one per child)
//! - [`IndexRow`] - one row of the bulk record/edge join used to build the index
//! - [`CollectionNode`] - a hierarchy-eligible node inside a loaded index
//!
//! # Root Representation
//!
//! A node is a root when it has no edge row, or when its edge row carries the
//! `parent_collection_id = 0` sentinel. Both shapes read as `parent_id = None`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a collection (the host record's primary key)
pub type CollectionId = u32;

/// Stored `parent_collection_id` value meaning "no parent"
pub const ROOT_PARENT_ID: CollectionId = 0;

/// Convert a stored parent column value into a model parent reference
pub fn parent_from_column(value: CollectionId) -> Option<CollectionId> {
    if value == ROOT_PARENT_ID {
        None
    } else {
        Some(value)
    }
}

/// Validation errors raised before a parent assignment is committed
///
/// Every variant is field-level: the host shows it next to the parent
/// selector and rejects the save without writing anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A collection cannot be a parent to itself (collection {collection_id})")]
    SelfParent { collection_id: CollectionId },

    #[error(
        "A collection cannot be assigned to a collection in its descendant tree \
         (collection {collection_id}, proposed parent {parent_id})"
    )]
    DescendantCycle {
        collection_id: CollectionId,
        parent_id: CollectionId,
    },

    #[error("Parent collection does not exist: {parent_id}")]
    UnknownParent { parent_id: CollectionId },

    #[error("Invalid parent collection value: '{0}'")]
    InvalidParentValue(String),
}

impl ValidationError {
    /// Stable reason code for callers that branch on the failure kind
    pub const fn code(&self) -> &'static str {
        match self {
            ValidationError::SelfParent { .. } => "SELF_PARENT",
            ValidationError::DescendantCycle { .. } => "DESCENDANT_CYCLE",
            ValidationError::UnknownParent { .. } => "UNKNOWN_PARENT",
            ValidationError::InvalidParentValue(_) => "INVALID_PARENT_VALUE",
        }
    }

    /// Form field the error belongs to
    pub const fn field(&self) -> &'static str {
        "Parent Collection"
    }

    /// User-facing message without internal ids
    pub const fn public_message(&self) -> &'static str {
        match self {
            ValidationError::SelfParent { .. } => "A collection cannot be a parent to itself.",
            ValidationError::DescendantCycle { .. } => {
                "A collection cannot be assigned to a collection in its descendant tree."
            }
            ValidationError::UnknownParent { .. } => "The selected parent collection does not exist.",
            ValidationError::InvalidParentValue(_) => "The selected parent collection is invalid.",
        }
    }
}

/// A collection as the host application knows it
///
/// Passed into the lifecycle hooks; `title` feeds the denormalized `name`
/// column of the edge row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRecord {
    pub id: CollectionId,
    pub title: Option<String>,
    pub public: bool,
}

impl CollectionRecord {
    pub fn new(id: CollectionId, title: impl Into<String>, public: bool) -> Self {
        Self {
            id,
            title: Some(title.into()),
            public,
        }
    }

    /// Title trimmed, with empty titles treated as missing
    pub fn display_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }
}

/// One persisted parent/child row of the `collection_trees` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEdge {
    /// Surrogate key
    pub id: i64,
    /// Raw stored parent (0 is the root sentinel)
    pub parent_collection_id: CollectionId,
    /// Child collection, unique across the table
    pub collection_id: CollectionId,
    /// Cached display title of the child
    pub name: Option<String>,
}

impl TreeEdge {
    /// Parent reference with the root sentinel mapped to `None`
    pub fn parent(&self) -> Option<CollectionId> {
        parent_from_column(self.parent_collection_id)
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }
}

/// One row of the bulk LEFT JOIN between host records and edges
///
/// `parent_collection_id` is `None` when the record has no edge row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub id: CollectionId,
    pub title: Option<String>,
    pub public: bool,
    pub parent_collection_id: Option<CollectionId>,
    pub cached_name: Option<String>,
}

impl IndexRow {
    /// Row for a record without any edge (a root)
    pub fn root(id: CollectionId, title: &str, public: bool) -> Self {
        Self {
            id,
            title: Some(title.to_string()),
            public,
            parent_collection_id: None,
            cached_name: None,
        }
    }

    /// Row for a record whose edge names `parent`
    pub fn child(id: CollectionId, title: &str, parent: CollectionId, public: bool) -> Self {
        Self {
            id,
            title: Some(title.to_string()),
            public,
            parent_collection_id: Some(parent),
            cached_name: Some(title.to_string()),
        }
    }
}

/// A hierarchy-eligible node inside a loaded index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionNode {
    pub id: CollectionId,

    /// Display name (host title, falling back to the cached edge name)
    pub name: Option<String>,

    /// Declared parent, `None` for roots
    pub parent_id: Option<CollectionId>,

    /// Nearest public ancestor, `None` when there is none
    pub public_parent_id: Option<CollectionId>,

    /// Host public flag
    pub visible: bool,
}

impl CollectionNode {
    pub fn from_row(row: IndexRow) -> Self {
        let title = row
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty());
        let name = title.or_else(|| row.cached_name.filter(|name| !name.trim().is_empty()));

        Self {
            id: row.id,
            name,
            parent_id: row.parent_collection_id.and_then(parent_from_column),
            public_parent_id: None,
            visible: row.public,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Name for display, substituting `untitled` for a missing name
    pub fn label<'a>(&'a self, untitled: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(untitled)
    }
}
