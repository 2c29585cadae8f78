//! Data Models
//!
//! Core data structures of the collection hierarchy:
//!
//! - `CollectionNode` / `TreeEdge` - stored and indexed hierarchy records
//! - `TreeNode` / `Ancestor` / `SelectOption` - derived views for rendering
//! - `ValidationError` - field-level rejection reasons for parent assignment

mod collection;
mod tree;

pub use collection::{
    parent_from_column, CollectionId, CollectionNode, CollectionRecord, IndexRow, TreeEdge,
    ValidationError, ROOT_PARENT_ID,
};
pub use tree::{Ancestor, SelectOption, SubmittedParent, TreeNode};
