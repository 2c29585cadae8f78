//! TursoStore - EdgeStore Implementation for the libsql Backend
//!
//! Wraps [`DatabaseService`] and delegates every operation to its `db_*`
//! methods. This layer only converts rows into models.
//!
//! # Examples
//!
//! ```rust,no_run
//! use collection_tree_core::db::{DatabaseService, EdgeStore, TursoStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/tree.db")).await?);
//!     let store: Arc<dyn EdgeStore> = Arc::new(TursoStore::new(db));
//!
//!     let edge = store.find_edge_by_child(42).await?;
//!     println!("{:?}", edge);
//!     Ok(())
//! }
//! ```

use crate::db::edge_store::EdgeStore;
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{CollectionId, IndexRow, TreeEdge};
use async_trait::async_trait;
use libsql::Row;
use std::sync::Arc;

/// TursoStore implements EdgeStore for libsql
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Underlying database service
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Convert a stored integer id into a collection id
    fn to_collection_id(value: i64, column: &str) -> Result<CollectionId, DatabaseError> {
        CollectionId::try_from(value).map_err(|_| {
            DatabaseError::InvalidValue(format!("{} out of range: {}", column, value))
        })
    }

    /// Convert libsql::Row to TreeEdge
    ///
    /// Expected columns (in order): id, parent_collection_id, collection_id, name
    fn row_to_edge(row: &Row) -> Result<TreeEdge, DatabaseError> {
        let id: i64 = row.get(0)?;
        let parent: i64 = row.get(1)?;
        let child: i64 = row.get(2)?;
        let name: Option<String> = row.get(3)?;

        Ok(TreeEdge {
            id,
            parent_collection_id: Self::to_collection_id(parent, "parent_collection_id")?,
            collection_id: Self::to_collection_id(child, "collection_id")?,
            name,
        })
    }

    /// Convert libsql::Row to IndexRow
    ///
    /// Expected columns (in order): id, title, public, parent_collection_id, name.
    /// The public flag is read as an integer; any non-zero value is public.
    fn row_to_index_row(row: &Row) -> Result<IndexRow, DatabaseError> {
        let id: i64 = row.get(0)?;
        let title: Option<String> = row.get(1)?;
        let public: Option<i64> = row.get(2)?;
        let parent: Option<i64> = row.get(3)?;
        let cached_name: Option<String> = row.get(4)?;

        Ok(IndexRow {
            id: Self::to_collection_id(id, "id")?,
            title,
            public: public.unwrap_or(0) != 0,
            parent_collection_id: parent
                .map(|value| Self::to_collection_id(value, "parent_collection_id"))
                .transpose()?,
            cached_name,
        })
    }

    async fn collect_edges(mut rows: libsql::Rows) -> Result<Vec<TreeEdge>, DatabaseError> {
        let mut edges = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            edges.push(Self::row_to_edge(&row)?);
        }
        Ok(edges)
    }
}

#[async_trait]
impl EdgeStore for TursoStore {
    async fn find_edge_by_child(
        &self,
        child_id: CollectionId,
    ) -> Result<Option<TreeEdge>, DatabaseError> {
        match self.db.db_get_edge_by_child(child_id).await? {
            Some(row) => Ok(Some(Self::row_to_edge(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_edges_by_parent(
        &self,
        parent_id: CollectionId,
    ) -> Result<Vec<TreeEdge>, DatabaseError> {
        let rows = self.db.db_get_edges_by_parent(parent_id).await?;
        Self::collect_edges(rows).await
    }

    async fn write_edge(
        &self,
        child_id: CollectionId,
        parent_id: CollectionId,
        name: Option<&str>,
    ) -> Result<TreeEdge, DatabaseError> {
        self.db.db_write_edge(child_id, parent_id, name).await?;

        self.find_edge_by_child(child_id).await?.ok_or_else(|| {
            DatabaseError::sql_execution(format!(
                "Edge for collection {} not found after write",
                child_id
            ))
        })
    }

    async fn refresh_name(
        &self,
        child_id: CollectionId,
        name: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let affected = self.db.db_refresh_name(child_id, name).await?;
        Ok(affected > 0)
    }

    async fn delete_by_child(&self, child_id: CollectionId) -> Result<bool, DatabaseError> {
        let affected = self.db.db_delete_edge(child_id).await?;
        Ok(affected > 0)
    }

    async fn promote_children_to_root(
        &self,
        parent_id: CollectionId,
    ) -> Result<Vec<CollectionId>, DatabaseError> {
        let children: Vec<CollectionId> = self
            .find_edges_by_parent(parent_id)
            .await?
            .into_iter()
            .map(|edge| edge.collection_id)
            .collect();

        if children.is_empty() {
            return Ok(children);
        }

        let affected = self.db.db_promote_children(parent_id).await?;
        tracing::debug!(
            "Promoted {} children of {} to root",
            affected,
            parent_id
        );
        Ok(children)
    }

    async fn load_index_rows(&self) -> Result<Vec<IndexRow>, DatabaseError> {
        let mut rows = self.db.db_load_index_rows().await?;

        let mut index_rows = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            index_rows.push(Self::row_to_index_row(&row)?);
        }
        Ok(index_rows)
    }

    async fn child_ids_with_parent(&self) -> Result<Vec<CollectionId>, DatabaseError> {
        let mut rows = self.db.db_get_child_ids_with_parent().await?;

        let mut ids = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let id: i64 = row.get(0)?;
            ids.push(Self::to_collection_id(id, "collection_id")?);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (TursoStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await.unwrap());
        (TursoStore::new(db), temp_dir)
    }

    #[tokio::test]
    async fn test_write_and_find_edge() {
        let (store, _temp_dir) = create_test_store().await;

        let edge = store.write_edge(2, 1, Some("Child")).await.unwrap();
        assert_eq!(edge.collection_id, 2);
        assert_eq!(edge.parent(), Some(1));
        assert_eq!(edge.name.as_deref(), Some("Child"));

        let found = store.find_edge_by_child(2).await.unwrap().unwrap();
        assert_eq!(found, edge);
        assert!(store.find_edge_by_child(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_updates_in_place() {
        let (store, _temp_dir) = create_test_store().await;

        let first = store.write_edge(5, 1, Some("Five")).await.unwrap();
        let second = store.write_edge(5, 3, None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.parent(), Some(3));
        assert_eq!(second.name, None);
        assert!(store.find_edges_by_parent(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, _temp_dir) = create_test_store().await;

        store.write_edge(2, 1, None).await.unwrap();
        assert!(store.delete_by_child(2).await.unwrap());
        assert!(!store.delete_by_child(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_promote_children_to_root() {
        let (store, _temp_dir) = create_test_store().await;

        store.write_edge(2, 1, None).await.unwrap();
        store.write_edge(3, 1, None).await.unwrap();
        store.write_edge(4, 2, None).await.unwrap();

        let promoted = store.promote_children_to_root(1).await.unwrap();
        assert_eq!(promoted, vec![2, 3]);

        let edge = store.find_edge_by_child(2).await.unwrap().unwrap();
        assert!(edge.is_root());
        assert_eq!(store.child_ids_with_parent().await.unwrap(), vec![4]);
        assert!(store.promote_children_to_root(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_name_requires_edge() {
        let (store, _temp_dir) = create_test_store().await;

        assert!(!store.refresh_name(9, Some("Nine")).await.unwrap());

        store.write_edge(9, 1, Some("Old")).await.unwrap();
        assert!(store.refresh_name(9, Some("New")).await.unwrap());
        let edge = store.find_edge_by_child(9).await.unwrap().unwrap();
        assert_eq!(edge.name.as_deref(), Some("New"));
    }
}
