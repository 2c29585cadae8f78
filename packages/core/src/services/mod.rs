//! Hierarchy Services
//!
//! - `CollectionIndex` - in-memory snapshot built from one bulk query
//! - `TreeBuilder` - descendant, ancestor, breadcrumb and select views
//! - `validator` - self-parent and cycle checks
//! - `ReparentService` - edge mutations on collection save and delete
//! - `TreeSession` - per-request query surface owning a lazily loaded index
//!
//! Services sit between the storage layer and the host application; views
//! are pure computations over the index, mutations go through `EdgeStore`.

pub mod collection_index;
pub mod error;
pub mod reparent_service;
pub mod tree_builder;
pub mod tree_session;
pub mod validator;

pub use collection_index::{CollectionIndex, IndexOptions, Ordering, ParentMode, Visibility};
pub use error::HierarchyError;
pub use reparent_service::{parse_submitted_parent, ReparentService, SaveOutcome};
pub use tree_builder::TreeBuilder;
pub use tree_session::TreeSession;
