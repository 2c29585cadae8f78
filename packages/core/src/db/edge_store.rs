//! EdgeStore Trait - Storage Abstraction for the Collection Hierarchy
//!
//! Persisted parent/child relation, one row per child. The trait keeps the
//! hierarchy services independent of the backing database; [`TursoStore`]
//! implements it over libsql.
//!
//! All mutations are visible to subsequent reads. Nothing is cached at this
//! layer; caching belongs to [`TreeSession`](crate::services::TreeSession).
//!
//! # Method Groups
//!
//! - **Edge reads**: `find_edge_by_child`, `find_edges_by_parent`
//! - **Edge writes**: `write_edge`, `refresh_name`, `delete_by_child`,
//!   `promote_children_to_root`, plus the validated `upsert`
//! - **Bulk reads**: `load_index_rows`, `child_ids_with_parent`
//!
//! [`TursoStore`]: crate::db::TursoStore

use crate::db::DatabaseError;
use crate::models::{CollectionId, IndexRow, TreeEdge};
use crate::services::collection_index::{CollectionIndex, IndexOptions};
use crate::services::validator;
use crate::services::HierarchyError;
use async_trait::async_trait;

#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// Edge row of `child_id`, if any
    async fn find_edge_by_child(
        &self,
        child_id: CollectionId,
    ) -> Result<Option<TreeEdge>, DatabaseError>;

    /// Every edge naming `parent_id` as parent, ascending child id
    async fn find_edges_by_parent(
        &self,
        parent_id: CollectionId,
    ) -> Result<Vec<TreeEdge>, DatabaseError>;

    /// Create or update the edge of `child_id` without validation
    ///
    /// The cached name is replaced, `None` included. Prefer [`EdgeStore::upsert`].
    async fn write_edge(
        &self,
        child_id: CollectionId,
        parent_id: CollectionId,
        name: Option<&str>,
    ) -> Result<TreeEdge, DatabaseError>;

    /// Refresh the cached name of an existing edge
    ///
    /// Returns false when `child_id` has no edge.
    async fn refresh_name(
        &self,
        child_id: CollectionId,
        name: Option<&str>,
    ) -> Result<bool, DatabaseError>;

    /// Delete the edge of `child_id`
    ///
    /// Idempotent; returns false when there was nothing to delete.
    async fn delete_by_child(&self, child_id: CollectionId) -> Result<bool, DatabaseError>;

    /// Rewrite every edge naming `parent_id` to the root sentinel
    ///
    /// Returns the promoted child ids.
    async fn promote_children_to_root(
        &self,
        parent_id: CollectionId,
    ) -> Result<Vec<CollectionId>, DatabaseError>;

    /// Every node source record joined with its edge, ascending id
    async fn load_index_rows(&self) -> Result<Vec<IndexRow>, DatabaseError>;

    /// Ids of collections that have a non-root edge
    async fn child_ids_with_parent(&self) -> Result<Vec<CollectionId>, DatabaseError>;

    /// Validated create-or-update of the edge of `child_id`
    ///
    /// Loads a fresh unfiltered index and rejects self-parenting, cycles and
    /// unknown parents before writing.
    ///
    /// # Errors
    ///
    /// - `HierarchyError::ValidationFailed` when the assignment is rejected
    /// - `HierarchyError::DatabaseError` when loading or writing fails
    async fn upsert(
        &self,
        child_id: CollectionId,
        parent_id: CollectionId,
        name: Option<&str>,
    ) -> Result<TreeEdge, HierarchyError> {
        let index = CollectionIndex::load(self, IndexOptions::unfiltered()).await?;
        validator::validate(&index, child_id, Some(parent_id))?;

        let edge = self.write_edge(child_id, parent_id, name).await?;
        tracing::debug!("Assigned collection {} under {}", child_id, parent_id);
        Ok(edge)
    }
}
