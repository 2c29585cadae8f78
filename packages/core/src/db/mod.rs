//! Database Layer
//!
//! Storage for the collection hierarchy using libsql (embedded,
//! SQLite-compatible):
//!
//! - Connection management and schema lifecycle (install, uninstall, upgrade)
//! - The `EdgeStore` abstraction and its libsql implementation
//! - Hierarchy events emitted after committed mutations

mod database;
mod edge_store;
mod error;
pub mod events;
mod turso_store;

pub use database::{DatabaseService, MigrationReport, EDGE_TABLE, LEGACY_NEST_TABLE};
pub use edge_store::EdgeStore;
pub use error::DatabaseError;
pub use events::{HierarchyEvent, HierarchyRelationship};
pub use turso_store::TursoStore;
