//! Database Connection Management
//!
//! Connection handling, schema installation and the raw SQL behind the edge
//! store, using libsql as an embedded SQLite-compatible database.
//!
//! # Schema
//!
//! One owned table, `collection_trees`, holds at most one row per child
//! collection. Collection records themselves live in a host table (by default
//! `collections(id, title, public)`) that this layer only reads.
//!
//! # Database Connection Patterns
//!
//! Use `connect_with_timeout()` in async functions. The 5-second busy timeout
//! lets concurrent writers wait instead of failing with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use collection_tree_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/tree.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The `db_*` methods return raw libsql rows; conversion into models happens
//! in [`TursoStore`](crate::db::TursoStore).

use crate::config::NodeSourceConfig;
use crate::db::error::DatabaseError;
use crate::models::CollectionId;
use libsql::{Builder, Database};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Name of the owned edge table
pub const EDGE_TABLE: &str = "collection_trees";

/// Name of the table used by the earliest nesting schema (`child`, `parent`)
pub const LEGACY_NEST_TABLE: &str = "nests";

/// Outcome of [`DatabaseService::upgrade`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// The `name` column was missing and has been added
    pub added_name_column: bool,
    /// Rows copied from the legacy nesting table
    pub imported_legacy_rows: u64,
    /// Edge rows whose empty name was filled from the node source title
    pub backfilled_names: u64,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        !self.added_name_column && self.imported_legacy_rows == 0 && self.backfilled_names == 0
    }
}

/// Database service for managing the libsql connection and hierarchy schema
///
/// # Examples
///
/// ```no_run
/// use collection_tree_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_service = DatabaseService::new(PathBuf::from("/path/to/tree.db")).await?;
///     db_service.upgrade().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    /// Host table the hierarchy is layered on
    node_source: NodeSourceConfig,
}

impl DatabaseService {
    /// Open the database at `db_path` and install the edge table
    ///
    /// Uses the default node source (`collections(id, title, public)`).
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::with_node_source(db_path, NodeSourceConfig::default()).await
    }

    /// Open the database and install the edge table, reading records from `node_source`
    pub async fn with_node_source(
        db_path: PathBuf,
        node_source: NodeSourceConfig,
    ) -> Result<Self, DatabaseError> {
        let service = Self::open(db_path, node_source).await?;
        service.install().await?;
        Ok(service)
    }

    /// Open the database without touching the schema
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - A node source name is not a plain SQL identifier
    /// - Parent directory cannot be created
    /// - Database connection fails
    pub async fn open(
        db_path: PathBuf,
        node_source: NodeSourceConfig,
    ) -> Result<Self, DatabaseError> {
        node_source
            .validate()
            .map_err(DatabaseError::InvalidIdentifier)?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        tracing::debug!("Opened hierarchy database at {:?}", db_path);

        Ok(Self {
            db: Arc::new(db),
            db_path,
            node_source,
        })
    }

    pub fn node_source(&self) -> &NodeSourceConfig {
        &self.node_source
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so they go through query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Get a connection handle
    ///
    /// Only for synchronous, single-threaded use; prefer `connect_with_timeout()`.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        Ok(conn)
    }

    //
    // SCHEMA LIFECYCLE
    //

    /// Create the edge table and its parent index
    ///
    /// Idempotent (CREATE ... IF NOT EXISTS). Existing collections are not
    /// seeded: a collection without an edge row is a root.
    pub async fn install(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS collection_trees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_collection_id INTEGER NOT NULL DEFAULT 0,
                -- at most one parent per collection
                collection_id INTEGER NOT NULL UNIQUE,
                name TEXT
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create collection_trees table: {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_collection_trees_parent
             ON collection_trees(parent_collection_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create idx_collection_trees_parent: {}",
                e
            ))
        })?;

        tracing::debug!("Installed {} schema", EDGE_TABLE);
        Ok(())
    }

    /// Drop the edge table
    pub async fn uninstall(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DROP TABLE IF EXISTS collection_trees", ())
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to drop collection_trees: {}", e))
            })?;

        tracing::info!("Uninstalled {} schema", EDGE_TABLE);
        Ok(())
    }

    /// Bring historical schemas up to the current shape
    ///
    /// Handles an edge table without the `name` column and the legacy
    /// `nests(child, parent)` table, then fills missing names from the node
    /// source. Running it on a current database changes nothing.
    pub async fn upgrade(&self) -> Result<MigrationReport, DatabaseError> {
        self.install().await?;
        let conn = self.connect_with_timeout().await?;
        let mut report = MigrationReport::default();

        if !self.column_exists(&conn, EDGE_TABLE, "name").await? {
            conn.execute("ALTER TABLE collection_trees ADD COLUMN name TEXT", ())
                .await
                .map_err(|e| {
                    DatabaseError::initialization_failed(format!(
                        "Failed to add name column: {}",
                        e
                    ))
                })?;
            report.added_name_column = true;
            tracing::info!("Added name column to {}", EDGE_TABLE);
        }

        if self.table_exists(&conn, LEGACY_NEST_TABLE).await? {
            report.imported_legacy_rows = conn
                .execute(
                    "INSERT OR IGNORE INTO collection_trees (parent_collection_id, collection_id)
                     SELECT parent, child FROM nests
                     WHERE child NOT IN (SELECT collection_id FROM collection_trees)",
                    (),
                )
                .await
                .map_err(|e| {
                    DatabaseError::initialization_failed(format!(
                        "Failed to import legacy nests rows: {}",
                        e
                    ))
                })?;
            tracing::info!(
                "Imported {} rows from {}",
                report.imported_legacy_rows,
                LEGACY_NEST_TABLE
            );
        }

        if self.table_exists(&conn, &self.node_source.table).await? {
            let source = &self.node_source;
            let sql = format!(
                "UPDATE collection_trees
                 SET name = (SELECT c.{title} FROM {table} c WHERE c.{id} = collection_trees.collection_id)
                 WHERE (name IS NULL OR name = '')
                   AND EXISTS (
                       SELECT 1 FROM {table} c
                       WHERE c.{id} = collection_trees.collection_id
                         AND c.{title} IS NOT NULL AND c.{title} != ''
                   )",
                title = source.title_column,
                table = source.table,
                id = source.id_column,
            );
            report.backfilled_names = conn.execute(&sql, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!("Failed to backfill names: {}", e))
            })?;
        } else {
            tracing::warn!(
                "Node source table '{}' not found, skipping name backfill",
                self.node_source.table
            );
        }

        if report.is_noop() {
            tracing::debug!("Schema already current");
        } else {
            tracing::info!("Upgraded hierarchy schema: {:?}", report);
        }

        Ok(report)
    }

    /// Returns true when `table` exists in the database
    pub async fn table_exists(
        &self,
        conn: &libsql::Connection,
        table: &str,
    ) -> Result<bool, DatabaseError> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare table lookup: {}", e))
            })?;

        let mut rows = stmt.query([table]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to look up table {}: {}", table, e))
        })?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn column_exists(
        &self,
        conn: &libsql::Connection,
        table: &str,
        column: &str,
    ) -> Result<bool, DatabaseError> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", table))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to read columns of {}: {}", table, e))
            })?;

        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to read columns of {}: {}", table, e))
        })?;

        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let name: String = row.get(1)?;
            if name == column {
                return Ok(true);
            }
        }
        Ok(false)
    }

    //
    // EDGE STORE OPERATIONS
    // Raw SQL wrapped by the EdgeStore trait implementation.
    //

    /// Fetch the edge row of a child
    ///
    /// Columns: id, parent_collection_id, collection_id, name
    pub async fn db_get_edge_by_child(
        &self,
        child_id: CollectionId,
    ) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, parent_collection_id, collection_id, name
                 FROM collection_trees WHERE collection_id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_edge query: {}", e))
            })?;

        let mut rows = stmt.query([i64::from(child_id)]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_edge query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Fetch every edge naming `parent_id` as parent, ordered by child id
    pub async fn db_get_edges_by_parent(
        &self,
        parent_id: CollectionId,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, parent_collection_id, collection_id, name
                 FROM collection_trees WHERE parent_collection_id = ?
                 ORDER BY collection_id",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare get_edges_by_parent query: {}",
                    e
                ))
            })?;

        stmt.query([i64::from(parent_id)]).await.map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to execute get_edges_by_parent query: {}",
                e
            ))
        })
    }

    /// Insert or update the edge of a child
    ///
    /// The cached name is replaced, `None` included.
    pub async fn db_write_edge(
        &self,
        child_id: CollectionId,
        parent_id: CollectionId,
        name: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO collection_trees (parent_collection_id, collection_id, name)
             VALUES (?, ?, ?)
             ON CONFLICT(collection_id) DO UPDATE SET
                 parent_collection_id = excluded.parent_collection_id,
                 name = excluded.name",
            (i64::from(parent_id), i64::from(child_id), name),
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to write edge", e))?;

        Ok(())
    }

    /// Refresh the cached name of an existing edge
    ///
    /// Returns rows affected (0 when the child has no edge).
    pub async fn db_refresh_name(
        &self,
        child_id: CollectionId,
        name: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "UPDATE collection_trees SET name = ? WHERE collection_id = ?",
            (name, i64::from(child_id)),
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to refresh edge name", e))
    }

    /// Delete the edge of a child
    ///
    /// Idempotent: returns 0 when there was no edge.
    pub async fn db_delete_edge(&self, child_id: CollectionId) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "DELETE FROM collection_trees WHERE collection_id = ?",
            [i64::from(child_id)],
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete edge: {}", e)))
    }

    /// Rewrite every edge naming `parent_id` to the root sentinel
    pub async fn db_promote_children(&self, parent_id: CollectionId) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "UPDATE collection_trees SET parent_collection_id = 0
             WHERE parent_collection_id = ?",
            [i64::from(parent_id)],
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to promote children", e))
    }

    /// Join every node source record with its edge, ordered by id
    ///
    /// Columns: id, title, public, parent_collection_id (NULL without edge), name
    pub async fn db_load_index_rows(&self) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let source = &self.node_source;

        let sql = format!(
            "SELECT c.{id}, c.{title}, c.{public}, ct.parent_collection_id, ct.name
             FROM {table} c
             LEFT JOIN collection_trees ct ON c.{id} = ct.collection_id
             ORDER BY c.{id}",
            id = source.id_column,
            title = source.title_column,
            public = source.public_column,
            table = source.table,
        );

        let mut stmt = conn.prepare(&sql).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare index load query: {}", e))
        })?;

        stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute index load query: {}", e))
        })
    }

    /// Ids of collections that have a non-root edge
    pub async fn db_get_child_ids_with_parent(&self) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT collection_id FROM collection_trees
                 WHERE parent_collection_id != 0
                 ORDER BY collection_id",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare child id query: {}", e))
            })?;

        stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute child id query: {}", e))
        })
    }
}
