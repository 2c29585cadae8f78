//! Tree Views over a Collection Index
//!
//! Pure computations over a loaded [`CollectionIndex`]: descendant subtrees,
//! root-first ancestor chains, breadcrumb trees and flattened select lists.
//! Nothing here touches storage or fails; unknown ids yield empty results.

use crate::models::{Ancestor, CollectionId, CollectionNode, SelectOption, TreeNode};
use crate::services::collection_index::CollectionIndex;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_UNTITLED_LABEL: &str = "[Untitled]";
pub const DEFAULT_UNAVAILABLE_LABEL: &str = "[Unavailable]";

/// Builds hierarchy views from a [`CollectionIndex`]
pub struct TreeBuilder<'a> {
    index: &'a CollectionIndex,
    untitled_label: &'a str,
    unavailable_label: &'a str,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(index: &'a CollectionIndex) -> Self {
        Self {
            index,
            untitled_label: DEFAULT_UNTITLED_LABEL,
            unavailable_label: DEFAULT_UNAVAILABLE_LABEL,
        }
    }

    /// Override the placeholder labels
    pub fn with_labels(mut self, untitled_label: &'a str, unavailable_label: &'a str) -> Self {
        self.untitled_label = untitled_label;
        self.unavailable_label = unavailable_label;
        self
    }

    fn label(&self, node: &CollectionNode) -> String {
        node.label(self.untitled_label).to_string()
    }

    /// Descendant subtree of `id`; its children have depth 1
    pub fn descendants(&self, id: CollectionId) -> Vec<TreeNode> {
        if !self.index.contains(id) {
            return Vec::new();
        }

        let mut visited = HashSet::from([id]);
        self.descend(id, 1, &mut visited)
    }

    fn descend(
        &self,
        id: CollectionId,
        depth: usize,
        visited: &mut HashSet<CollectionId>,
    ) -> Vec<TreeNode> {
        let mut children = Vec::new();

        for child_id in self.index.children_of(id) {
            if !visited.insert(*child_id) {
                tracing::warn!(
                    "Cycle in stored hierarchy: {} reached again below {}",
                    child_id,
                    id
                );
                continue;
            }

            let Some(child) = self.index.get(*child_id) else {
                continue;
            };

            let mut node = TreeNode::leaf(child.id, self.label(child), depth);
            node.children = self.descend(child.id, depth + 1, visited);
            children.push(node);
        }

        children
    }

    /// Ancestors of `id`, root first
    ///
    /// When a parent is hidden from the view or missing, the chain stops with
    /// an [`Ancestor::Unavailable`] entry at its top.
    pub fn ancestors(&self, id: CollectionId, include_self: bool) -> Vec<Ancestor> {
        let Some(node) = self.index.get(id) else {
            return Vec::new();
        };

        let mut chain = Vec::new();
        if include_self {
            chain.push(Ancestor::Node(node.clone()));
        }

        let mut visited = HashSet::from([id]);
        let mut current = self.index.parent_of(id);

        while let Some(parent_id) = current {
            if !visited.insert(parent_id) {
                tracing::warn!(
                    "Cycle in stored hierarchy above {}: {} revisited",
                    id,
                    parent_id
                );
                break;
            }

            match self.index.get(parent_id) {
                Some(parent) => {
                    chain.push(Ancestor::Node(parent.clone()));
                    current = self.index.parent_of(parent_id);
                }
                None => {
                    chain.push(Ancestor::Unavailable);
                    break;
                }
            }
        }

        chain.reverse();
        chain
    }

    /// Breadcrumb tree of `id`
    ///
    /// Each ancestor carries only the path toward `id`; the `id` node is marked
    /// current and carries its full descendant subtree.
    pub fn full_tree(&self, id: CollectionId) -> Vec<TreeNode> {
        let Some(node) = self.index.get(id) else {
            return Vec::new();
        };

        let ancestors = self.ancestors(id, false);
        let base_depth = ancestors.len();

        let mut visited = HashSet::from([id]);
        let mut subtree = TreeNode::leaf(id, self.label(node), base_depth);
        subtree.current = true;
        subtree.children = self.descend(id, base_depth + 1, &mut visited);

        for (depth, ancestor) in ancestors.iter().enumerate().rev() {
            let mut wrapper = match ancestor {
                Ancestor::Node(parent) => TreeNode::leaf(parent.id, self.label(parent), depth),
                Ancestor::Unavailable => TreeNode::unavailable(self.unavailable_label, depth),
            };
            wrapper.children = vec![subtree];
            subtree = wrapper;
        }

        vec![subtree]
    }

    /// Root nodes of the view, in view order
    pub fn root_nodes(&self) -> Vec<CollectionNode> {
        self.index
            .roots()
            .iter()
            .filter_map(|id| self.index.get(*id))
            .cloned()
            .collect()
    }

    /// Pre-order listing of the whole view for selection UIs
    ///
    /// Roots carry their plain name; descendants are prefixed with `padding`
    /// repeated once per depth level and a space. With `priorities`, siblings
    /// that have a priority come first (ascending), the rest keep view order.
    pub fn flatten_for_select(
        &self,
        padding: &str,
        priorities: Option<&HashMap<CollectionId, i64>>,
    ) -> Vec<SelectOption> {
        let mut options = Vec::with_capacity(self.index.len());
        let mut visited = HashSet::new();

        for root_id in prioritize(self.index.roots(), priorities) {
            if let Some(root) = self.index.get(root_id) {
                visited.insert(root_id);
                options.push(SelectOption {
                    id: root_id,
                    label: self.label(root),
                    depth: 0,
                });
                self.flatten_children(root_id, 1, padding, priorities, &mut visited, &mut options);
            }
        }

        options
    }

    fn flatten_children(
        &self,
        id: CollectionId,
        depth: usize,
        padding: &str,
        priorities: Option<&HashMap<CollectionId, i64>>,
        visited: &mut HashSet<CollectionId>,
        options: &mut Vec<SelectOption>,
    ) {
        for child_id in prioritize(self.index.children_of(id), priorities) {
            if !visited.insert(child_id) {
                tracing::warn!("Cycle in stored hierarchy: {} listed twice", child_id);
                continue;
            }

            let Some(child) = self.index.get(child_id) else {
                continue;
            };

            options.push(SelectOption {
                id: child_id,
                label: format!("{} {}", padding.repeat(depth), self.label(child)),
                depth,
            });
            self.flatten_children(child_id, depth + 1, padding, priorities, visited, options);
        }
    }
}

/// Stable reorder of siblings: prioritized ascending, then the rest in input order
fn prioritize(
    siblings: &[CollectionId],
    priorities: Option<&HashMap<CollectionId, i64>>,
) -> Vec<CollectionId> {
    let mut ordered = siblings.to_vec();
    if let Some(priorities) = priorities {
        ordered.sort_by_key(|id| match priorities.get(id) {
            Some(priority) => (0, *priority),
            None => (1, 0),
        });
    }
    ordered
}
