//! Tree Session
//!
//! Per-request query surface of the hierarchy. A session owns one lazily
//! loaded [`CollectionIndex`] for the viewer it was created for; every query
//! after the first reuses it. After a mutation through
//! [`ReparentService`](crate::services::ReparentService), call
//! [`TreeSession::invalidate`] (or start a new session) to see the change.
//!
//! ```rust,no_run
//! use collection_tree_core::config::{TreeConfig, Viewer};
//! use collection_tree_core::db::{DatabaseService, TursoStore};
//! use collection_tree_core::services::TreeSession;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/tree.db")).await?);
//!     let store = Arc::new(TursoStore::new(db));
//!
//!     let mut session = TreeSession::new(store, TreeConfig::default(), Viewer::public())?;
//!     for option in session.get_select_options(None).await? {
//!         println!("{}", option.label);
//!     }
//!     Ok(())
//! }
//! ```

use crate::config::{ConfigError, TreeConfig, Viewer};
use crate::db::{DatabaseError, EdgeStore};
use crate::models::{Ancestor, CollectionId, CollectionNode, SelectOption, TreeNode};
use crate::services::collection_index::{CollectionIndex, IndexOptions};
use crate::services::tree_builder::TreeBuilder;
use crate::services::validator;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Query surface bound to one viewer and one index snapshot
pub struct TreeSession<S: EdgeStore + ?Sized> {
    store: Arc<S>,
    config: TreeConfig,
    viewer: Viewer,
    options: IndexOptions,
    index: Option<CollectionIndex>,
}

impl<S: EdgeStore + ?Sized> TreeSession<S> {
    /// Create a session, rejecting an invalid `config`
    pub fn new(store: Arc<S>, config: TreeConfig, viewer: Viewer) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Invalid)?;

        let options = config.index_options(viewer);
        Ok(Self {
            store,
            config,
            viewer,
            options,
            index: None,
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    pub fn is_loaded(&self) -> bool {
        self.index.is_some()
    }

    /// Drop the cached index; the next query reloads it
    pub fn invalidate(&mut self) {
        if self.index.take().is_some() {
            tracing::debug!("Hierarchy index invalidated");
        }
    }

    async fn loaded(&mut self) -> Result<(&CollectionIndex, &TreeConfig), DatabaseError> {
        let index = match self.index.take() {
            Some(index) => index,
            None => CollectionIndex::load(self.store.as_ref(), self.options).await?,
        };
        let index = self.index.insert(index);
        Ok((index, &self.config))
    }

    /// The session's index, loading it on first use
    pub async fn index(&mut self) -> Result<&CollectionIndex, DatabaseError> {
        Ok(self.loaded().await?.0)
    }

    fn builder<'a>(index: &'a CollectionIndex, config: &'a TreeConfig) -> TreeBuilder<'a> {
        TreeBuilder::new(index).with_labels(&config.untitled_label, &config.unavailable_label)
    }

    /// Breadcrumb tree of `id` with its descendant subtree
    pub async fn get_tree(&mut self, id: CollectionId) -> Result<Vec<TreeNode>, DatabaseError> {
        let (index, config) = self.loaded().await?;
        Ok(Self::builder(index, config).full_tree(id))
    }

    /// Root-first ancestors of `id`
    pub async fn get_ancestors(
        &mut self,
        id: CollectionId,
        include_self: bool,
    ) -> Result<Vec<Ancestor>, DatabaseError> {
        let (index, config) = self.loaded().await?;
        Ok(Self::builder(index, config).ancestors(id, include_self))
    }

    pub async fn get_descendants(&mut self, id: CollectionId) -> Result<Vec<TreeNode>, DatabaseError> {
        let (index, config) = self.loaded().await?;
        Ok(Self::builder(index, config).descendants(id))
    }

    pub async fn get_root_nodes(&mut self) -> Result<Vec<CollectionNode>, DatabaseError> {
        let (index, config) = self.loaded().await?;
        Ok(Self::builder(index, config).root_nodes())
    }

    /// Flattened, padded listing for parent selectors and search filters
    pub async fn get_select_options(
        &mut self,
        priorities: Option<&HashMap<CollectionId, i64>>,
    ) -> Result<Vec<SelectOption>, DatabaseError> {
        let (index, config) = self.loaded().await?;
        Ok(Self::builder(index, config).flatten_for_select(&config.padding, priorities))
    }

    /// `id` and every declared descendant, hidden ones included
    pub async fn get_unassignable_ids(
        &mut self,
        id: CollectionId,
    ) -> Result<HashSet<CollectionId>, DatabaseError> {
        let (index, _) = self.loaded().await?;
        Ok(validator::unassignable_targets(index, id))
    }

    /// Nodes `id` may be placed under, in view order
    pub async fn get_assignable_parents(
        &mut self,
        id: CollectionId,
    ) -> Result<Vec<CollectionNode>, DatabaseError> {
        let (index, _) = self.loaded().await?;
        let excluded = validator::unassignable_targets(index, id);
        Ok(index
            .nodes()
            .filter(|node| !excluded.contains(&node.id))
            .cloned()
            .collect())
    }

    /// Non-root collections whose declared parent is missing or not public
    ///
    /// These are the collections a public viewer cannot reach from any root
    /// unless `display_all_public_collections` is on.
    pub async fn get_nodes_without_public_parent(
        &mut self,
    ) -> Result<Vec<CollectionNode>, DatabaseError> {
        let (index, _) = self.loaded().await?;
        Ok(index.without_public_parent().into_iter().cloned().collect())
    }

    /// Collections an item search scoped to `id` should match
    ///
    /// Just `id` unless `expand_subcollections` is on, in which case the
    /// descendants visible to this viewer are added.
    pub async fn expand_with_descendants(
        &mut self,
        id: CollectionId,
    ) -> Result<Vec<CollectionId>, DatabaseError> {
        if !self.config.expand_subcollections {
            return Ok(vec![id]);
        }

        let (index, config) = self.loaded().await?;
        let mut ids = vec![id];
        for subtree in Self::builder(index, config).descendants(id) {
            ids.extend(subtree.flatten_ids());
        }
        Ok(ids)
    }

    /// Apply the root-only browse toggle to a browse result
    ///
    /// Only the public side is filtered; admin listings are returned as is.
    pub async fn filter_browse_ids(
        &self,
        ids: &[CollectionId],
        admin: bool,
    ) -> Result<Vec<CollectionId>, DatabaseError> {
        if admin || !self.config.browse_only_root {
            return Ok(ids.to_vec());
        }

        let children: HashSet<CollectionId> =
            self.store.child_ids_with_parent().await?.into_iter().collect();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !children.contains(id))
            .collect())
    }

    /// Select options limited to ids another filter allowed
    pub async fn restrict_select_options(
        &mut self,
        allowed: &HashSet<CollectionId>,
    ) -> Result<Vec<SelectOption>, DatabaseError> {
        let options = self.get_select_options(None).await?;
        Ok(options
            .into_iter()
            .filter(|option| allowed.contains(&option.id))
            .collect())
    }
}
