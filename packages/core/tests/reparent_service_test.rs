//! Reparent Service Tests
//!
//! Lifecycle hooks against a real libsql database: validation before writes,
//! edge round-trips, delete promotion and event emission.

#[cfg(test)]
mod reparent_service_tests {
    use anyhow::Result;
    use collection_tree_core::config::{TreeConfig, Viewer};
    use collection_tree_core::db::{DatabaseService, EdgeStore, HierarchyEvent, TursoStore};
    use collection_tree_core::models::{CollectionRecord, SubmittedParent};
    use collection_tree_core::models::CollectionId;
    use collection_tree_core::services::{HierarchyError, ReparentService, SaveOutcome, TreeSession};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::broadcast;
    use tokio::time::{timeout, Duration};

    /// Helper to create a database with a host `collections` table
    async fn create_test_db(
        records: &[(u32, &str, bool)],
    ) -> Result<(Arc<TursoStore>, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db = Arc::new(DatabaseService::new(temp_dir.path().join("test.db")).await?);

        let conn = db.connect_with_timeout().await?;
        conn.execute(
            "CREATE TABLE collections (id INTEGER PRIMARY KEY, title TEXT, public INTEGER NOT NULL DEFAULT 0)",
            (),
        )
        .await?;
        for (id, title, public) in records {
            conn.execute(
                "INSERT INTO collections (id, title, public) VALUES (?, ?, ?)",
                (i64::from(*id), *title, i64::from(*public)),
            )
            .await?;
        }

        Ok((Arc::new(TursoStore::new(db)), temp_dir))
    }

    fn record(id: u32, title: &str) -> CollectionRecord {
        CollectionRecord::new(id, title, true)
    }

    #[tokio::test]
    async fn test_self_parent_blocked_before_save() -> Result<()> {
        let (store, _temp_dir) = create_test_db(&[(1, "One", true)]).await?;
        let service = ReparentService::new(store.clone());

        let err = service
            .before_save(&record(1, "One"), Some(SubmittedParent::Parent(1)))
            .await
            .unwrap_err();

        assert_eq!(err.validation().map(|e| e.code()), Some("SELF_PARENT"));
        assert_eq!(
            err.field_message().map(|(field, _)| field),
            Some("Parent Collection")
        );
        assert!(store.find_edge_by_child(1).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_descendant_cycle_rejected_without_write() -> Result<()> {
        let (store, _temp_dir) =
            create_test_db(&[(1, "One", true), (2, "Two", true), (3, "Three", true)]).await?;
        let service = ReparentService::new(store.clone());

        service
            .after_save(&record(2, "Two"), Some(SubmittedParent::Parent(1)))
            .await?;
        service
            .after_save(&record(3, "Three"), Some(SubmittedParent::Parent(2)))
            .await?;

        let before = service
            .before_save(&record(1, "One"), Some(SubmittedParent::Parent(3)))
            .await;
        assert_eq!(
            before.unwrap_err().validation().map(|e| e.code()),
            Some("DESCENDANT_CYCLE")
        );

        // after_save validates on its own too
        let after = service
            .after_save(&record(1, "One"), Some(SubmittedParent::Parent(3)))
            .await;
        assert!(matches!(after, Err(HierarchyError::ValidationFailed(_))));
        assert!(store.find_edge_by_child(1).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_two_node_cycle() -> Result<()> {
        let (store, _temp_dir) = create_test_db(&[(1, "One", true), (2, "Two", true)]).await?;
        store.upsert(2, 1, Some("Two")).await?;

        let err = store.upsert(1, 2, Some("One")).await.unwrap_err();
        assert_eq!(err.validation().map(|e| e.code()), Some("DESCENDANT_CYCLE"));
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_round_trip() -> Result<()> {
        let (store, _temp_dir) =
            create_test_db(&[(1, "One", true), (3, "Three", true), (5, "Five", true)]).await?;
        let service = ReparentService::new(store.clone());

        service
            .after_save(&record(5, "Five"), Some(SubmittedParent::Parent(1)))
            .await?;
        let outcome = service
            .after_save(&record(5, "Five"), Some(SubmittedParent::Parent(3)))
            .await?;

        let edge = match outcome {
            SaveOutcome::Assigned(edge) => edge,
            other => panic!("expected assignment, got {:?}", other),
        };
        assert_eq!(edge.parent(), Some(3));

        let stored = store.find_edge_by_child(5).await?.unwrap();
        assert_eq!(stored.parent(), Some(3));
        assert_eq!(stored.name.as_deref(), Some("Five"));
        assert!(store.find_edges_by_parent(1).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_parent_rejected() -> Result<()> {
        let (store, _temp_dir) = create_test_db(&[(1, "One", true)]).await?;
        let service = ReparentService::new(store.clone());

        let err = service
            .after_save(&record(1, "One"), Some(SubmittedParent::Parent(42)))
            .await
            .unwrap_err();
        assert_eq!(err.validation().map(|e| e.code()), Some("UNKNOWN_PARENT"));
        Ok(())
    }

    #[tokio::test]
    async fn test_root_submission_deletes_edge() -> Result<()> {
        let (store, _temp_dir) = create_test_db(&[(1, "One", true), (2, "Two", true)]).await?;
        let service = ReparentService::new(store.clone());

        service
            .after_save(&record(2, "Two"), Some(SubmittedParent::Parent(1)))
            .await?;
        let outcome = service
            .after_save(&record(2, "Two"), Some(SubmittedParent::Root))
            .await?;

        assert_eq!(outcome, SaveOutcome::Detached { removed: true });
        assert!(store.find_edge_by_child(2).await?.is_none());

        let again = service
            .after_save(&record(2, "Two"), Some(SubmittedParent::Root))
            .await?;
        assert_eq!(again, SaveOutcome::Detached { removed: false });
        Ok(())
    }

    #[tokio::test]
    async fn test_absent_field_only_refreshes_name() -> Result<()> {
        let (store, _temp_dir) = create_test_db(&[(1, "One", true), (2, "Two", true)]).await?;
        let service = ReparentService::new(store.clone());

        service
            .after_save(&record(2, "Two"), Some(SubmittedParent::Parent(1)))
            .await?;
        let outcome = service.after_save(&record(2, "Renamed"), None).await?;

        assert_eq!(outcome, SaveOutcome::NameRefreshed { updated: true });
        let edge = store.find_edge_by_child(2).await?.unwrap();
        assert_eq!(edge.parent(), Some(1));
        assert_eq!(edge.name.as_deref(), Some("Renamed"));

        // roots have no edge to refresh
        let root = service.after_save(&record(1, "One"), None).await?;
        assert_eq!(root, SaveOutcome::NameRefreshed { updated: false });
        assert!(store.find_edge_by_child(1).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_promotes_children() -> Result<()> {
        let (store, _temp_dir) =
            create_test_db(&[(1, "One", true), (2, "Two", true), (3, "Three", true)]).await?;
        let service = ReparentService::new(store.clone());

        service
            .after_save(&record(2, "Two"), Some(SubmittedParent::Parent(1)))
            .await?;
        service
            .after_save(&record(3, "Three"), Some(SubmittedParent::Parent(2)))
            .await?;

        // the host removes its record first
        let conn = store.database().connect_with_timeout().await?;
        conn.execute("DELETE FROM collections WHERE id = 2", ()).await?;

        let promoted = service.after_delete(2).await?;
        assert_eq!(promoted, vec![3]);

        assert!(store.find_edge_by_child(2).await?.is_none());
        let three = store.find_edge_by_child(3).await?.unwrap();
        assert!(three.is_root());

        let mut session = TreeSession::new(store.clone(), TreeConfig::default(), Viewer::admin())?;
        let roots: Vec<CollectionId> = session
            .get_root_nodes()
            .await?
            .iter()
            .map(|node| node.id)
            .collect();
        assert_eq!(roots, vec![1, 3]);
        assert!(session.get_descendants(1).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cleared_title_clears_cached_name() -> Result<()> {
        let (store, _temp_dir) = create_test_db(&[(1, "One", true), (2, "Two", true)]).await?;
        let service = ReparentService::new(store.clone());

        service
            .after_save(&record(2, "Two"), Some(SubmittedParent::Parent(1)))
            .await?;

        let conn = store.database().connect_with_timeout().await?;
        conn.execute("UPDATE collections SET title = '' WHERE id = 2", ())
            .await?;
        service
            .after_save(&record(2, ""), Some(SubmittedParent::Parent(1)))
            .await?;

        let edge = store.find_edge_by_child(2).await?.unwrap();
        assert_eq!(edge.name, None);

        let mut session = TreeSession::new(store, TreeConfig::default(), Viewer::admin())?;
        let labels: Vec<String> = session
            .get_select_options(None)
            .await?
            .into_iter()
            .map(|option| option.label)
            .collect();
        assert_eq!(labels, vec!["One".to_string(), "- [Untitled]".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_events_emitted_after_commit() -> Result<()> {
        let (store, _temp_dir) =
            create_test_db(&[(1, "One", true), (2, "Two", true), (3, "Three", true)]).await?;
        let (tx, mut rx) = broadcast::channel(16);
        let service =
            ReparentService::with_events(store.clone(), tx, Some("client-a".to_string()));

        service
            .after_save(&record(2, "Two"), Some(SubmittedParent::Parent(1)))
            .await?;
        let event = timeout(Duration::from_secs(1), rx.recv()).await??;
        match event {
            HierarchyEvent::ParentAssigned {
                relationship,
                source_client_id,
            } => {
                assert_eq!(relationship.parent_id, 1);
                assert_eq!(relationship.child_id, 2);
                assert_eq!(source_client_id.as_deref(), Some("client-a"));
            }
            other => panic!("unexpected event {:?}", other),
        }

        // rejected saves emit nothing
        let _ = service
            .after_save(&record(1, "One"), Some(SubmittedParent::Parent(2)))
            .await;
        assert!(rx.try_recv().is_err());

        service
            .after_save(&record(3, "Three"), Some(SubmittedParent::Parent(1)))
            .await?;
        let _ = rx.recv().await?;

        service.after_delete(1).await?;
        let event = timeout(Duration::from_secs(1), rx.recv()).await??;
        assert_eq!(
            event,
            HierarchyEvent::ChildrenPromoted {
                former_parent_id: 1,
                child_ids: vec![2, 3],
                source_client_id: Some("client-a".to_string()),
            }
        );
        Ok(())
    }
}
