//! Collection Index
//!
//! In-memory snapshot of every collection and its parent, built once from a
//! single bulk query. All hierarchy traversal runs over this index, so a
//! request never issues per-node queries.
//!
//! ## Views
//!
//! The index keeps two layers:
//!
//! - every loaded row, with its declared parent (`lookup`, `declared_children_of`).
//!   The validator works on this layer because cycles must be detected through
//!   private collections too.
//! - the view selected by [`IndexOptions`] (`get`, `children_of`, `parent_of`,
//!   `roots`), filtered by visibility and ordered for display.
//!
//! ## Parent Modes
//!
//! In `Declared` mode a node hangs under its stored parent, even when that
//! parent is hidden from the view. In `PublicAncestor` mode a node hangs under
//! its nearest public ancestor instead, so hidden intermediate collections are
//! skipped.

use crate::db::{DatabaseError, EdgeStore};
use crate::models::{CollectionId, CollectionNode, IndexRow};
use std::collections::{HashMap, HashSet};

/// Which nodes a view contains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    All,
    PublicOnly,
}

/// Which parent a node hangs under in a view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentMode {
    #[default]
    Declared,
    PublicAncestor,
}

/// Sibling order of a view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ordering {
    /// Ascending id
    #[default]
    Natural,
    /// Case-insensitive by name, unnamed first, ties by id
    Alphabetic,
}

/// View parameters of a [`CollectionIndex`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub visibility: Visibility,
    pub parent_mode: ParentMode,
    pub ordering: Ordering,
}

impl IndexOptions {
    /// Every node, declared parents, id order
    pub fn unfiltered() -> Self {
        Self::default()
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self
    }
}

/// Id-keyed snapshot of the collection hierarchy
#[derive(Debug, Clone, Default)]
pub struct CollectionIndex {
    options: IndexOptions,

    /// Every loaded row
    nodes: HashMap<CollectionId, CollectionNode>,

    /// Declared children over every row, ascending id
    declared_children: HashMap<CollectionId, Vec<CollectionId>>,

    /// Ids in the view, in view order
    view_order: Vec<CollectionId>,

    /// View-aware parent of every node in the view
    view_parent: HashMap<CollectionId, Option<CollectionId>>,

    /// View-aware children, in view order
    view_children: HashMap<CollectionId, Vec<CollectionId>>,

    view_roots: Vec<CollectionId>,
}

impl CollectionIndex {
    /// Load every row from `store` and build the index in one pass
    pub async fn load<S>(store: &S, options: IndexOptions) -> Result<Self, DatabaseError>
    where
        S: EdgeStore + ?Sized,
    {
        let rows = store.load_index_rows().await?;
        tracing::debug!("Loaded {} collection rows for index", rows.len());
        Ok(Self::from_rows(rows, options))
    }

    /// Build the index from already loaded rows
    pub fn from_rows(rows: Vec<IndexRow>, options: IndexOptions) -> Self {
        let mut nodes: HashMap<CollectionId, CollectionNode> = HashMap::with_capacity(rows.len());
        for row in rows {
            let node = CollectionNode::from_row(row);
            nodes.insert(node.id, node);
        }

        let mut ids: Vec<CollectionId> = nodes.keys().copied().collect();
        ids.sort_unstable();

        let mut declared_children: HashMap<CollectionId, Vec<CollectionId>> = HashMap::new();
        for id in &ids {
            if let Some(parent_id) = nodes.get(id).and_then(|node| node.parent_id) {
                declared_children.entry(parent_id).or_default().push(*id);
            }
        }

        let public_parents: Vec<(CollectionId, Option<CollectionId>)> = ids
            .iter()
            .map(|id| (*id, nearest_public_ancestor(&nodes, *id)))
            .collect();
        for (id, public_parent) in public_parents {
            if let Some(node) = nodes.get_mut(&id) {
                node.public_parent_id = public_parent;
            }
        }

        let mut index = Self {
            options,
            nodes,
            declared_children,
            ..Default::default()
        };
        index.build_view(ids);
        index
    }

    fn build_view(&mut self, ids: Vec<CollectionId>) {
        let mut view_order: Vec<CollectionId> = ids
            .into_iter()
            .filter(|id| self.nodes.get(id).is_some_and(|node| self.in_view(node)))
            .collect();

        if self.options.ordering == Ordering::Alphabetic {
            // ids arrive ascending, and the sort is stable
            view_order.sort_by_cached_key(|id| {
                self.nodes
                    .get(id)
                    .and_then(|node| node.name.as_ref())
                    .map(|name| name.to_lowercase())
            });
        }

        for id in &view_order {
            let parent = self.nodes.get(id).and_then(|node| match self.options.parent_mode {
                ParentMode::Declared => node.parent_id,
                ParentMode::PublicAncestor => node.public_parent_id,
            });

            self.view_parent.insert(*id, parent);
            match parent {
                Some(parent_id) => self.view_children.entry(parent_id).or_default().push(*id),
                None => self.view_roots.push(*id),
            }
        }

        self.view_order = view_order;
    }

    fn in_view(&self, node: &CollectionNode) -> bool {
        match self.options.visibility {
            Visibility::All => true,
            Visibility::PublicOnly => node.visible,
        }
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// Node in the current view
    pub fn get(&self, id: CollectionId) -> Option<&CollectionNode> {
        if self.view_parent.contains_key(&id) {
            self.nodes.get(&id)
        } else {
            None
        }
    }

    /// Any loaded node, hidden ones included
    pub fn lookup(&self, id: CollectionId) -> Option<&CollectionNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: CollectionId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// View-aware children of `id`, in view order
    pub fn children_of(&self, id: CollectionId) -> &[CollectionId] {
        self.view_children
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Declared children of `id` over every loaded row, ascending id
    pub fn declared_children_of(&self, id: CollectionId) -> &[CollectionId] {
        self.declared_children
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// View-aware parent of `id`; `None` for roots and for ids outside the view
    pub fn parent_of(&self, id: CollectionId) -> Option<CollectionId> {
        self.view_parent.get(&id).copied().flatten()
    }

    /// Roots of the view, in view order
    pub fn roots(&self) -> &[CollectionId] {
        &self.view_roots
    }

    /// Every id in the view, in view order
    pub fn ids(&self) -> &[CollectionId] {
        &self.view_order
    }

    /// Nodes of the view, in view order
    pub fn nodes(&self) -> impl Iterator<Item = &CollectionNode> + '_ {
        self.view_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Number of nodes in the view
    pub fn len(&self) -> usize {
        self.view_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view_order.is_empty()
    }

    /// Non-root nodes in the view whose declared parent is missing or not public
    pub fn without_public_parent(&self) -> Vec<&CollectionNode> {
        let mut ids: Vec<CollectionId> = self
            .nodes
            .values()
            .filter(|node| self.view_parent.contains_key(&node.id))
            .filter(|node| match node.parent_id {
                Some(parent_id) => !self.nodes.get(&parent_id).is_some_and(|p| p.visible),
                None => false,
            })
            .map(|node| node.id)
            .collect();
        ids.sort_unstable();
        ids.iter().filter_map(|id| self.nodes.get(id)).collect()
    }
}

/// Climb declared parents until a public one is found
///
/// Dangling parents end the climb (the node reads as having no public
/// ancestor); a cycle in stored data is logged and treated the same way.
fn nearest_public_ancestor(
    nodes: &HashMap<CollectionId, CollectionNode>,
    id: CollectionId,
) -> Option<CollectionId> {
    let mut visited: HashSet<CollectionId> = HashSet::new();
    visited.insert(id);
    let mut current = nodes.get(&id)?.parent_id;

    while let Some(parent_id) = current {
        if !visited.insert(parent_id) {
            tracing::warn!(
                "Cycle in stored hierarchy while resolving public parent of {} (revisited {})",
                id,
                parent_id
            );
            return None;
        }

        let Some(parent) = nodes.get(&parent_id) else {
            tracing::debug!("Collection {} has dangling parent {}", id, parent_id);
            return None;
        };

        if parent.visible {
            return Some(parent_id);
        }
        current = parent.parent_id;
    }

    None
}
