//! Collection Tree Core
//!
//! Single-parent hierarchy over a host application's flat collection
//! records: edge storage, hierarchy queries and cycle prevention.
//!
//! # Architecture
//!
//! - **One edge per child**: `collection_trees.collection_id` is UNIQUE, so a
//!   collection has at most one parent
//! - **Roots by absence**: a collection without an edge (or with the `0`
//!   sentinel parent) is a root
//! - **Session-owned index**: all rows are loaded once per `TreeSession` and
//!   traversed in memory
//! - **Validate before write**: self-parenting and cycles are rejected before
//!   anything is stored
//!
//! # Modules
//!
//! - [`models`] - Data structures (CollectionNode, TreeEdge, TreeNode, ...)
//! - [`db`] - libsql storage, schema lifecycle and the `EdgeStore` trait
//! - [`services`] - Index, tree views, validation, reparenting, sessions
//! - [`config`] - Host options and node source mapping

pub mod config;
pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::{TreeConfig, Viewer};
pub use models::*;
pub use services::*;
