//! Parent Assignment Validation
//!
//! A collection may not be its own parent and may not be placed under one of
//! its own descendants. Both checks run over every loaded row of the index,
//! hidden collections included.

use crate::models::{CollectionId, ValidationError};
use crate::services::collection_index::CollectionIndex;
use std::collections::HashSet;

/// The node plus every declared descendant of it
///
/// These are the collections `id` cannot be assigned to. A visited guard
/// keeps malformed stored cycles from looping.
pub fn unassignable_targets(index: &CollectionIndex, id: CollectionId) -> HashSet<CollectionId> {
    let mut targets = HashSet::new();
    targets.insert(id);

    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        for child in index.declared_children_of(current) {
            if targets.insert(*child) {
                stack.push(*child);
            }
        }
    }

    targets
}

/// Check that `child_id` may hang under `proposed_parent`
///
/// A `None` proposal (detach to root) is always valid.
pub fn validate(
    index: &CollectionIndex,
    child_id: CollectionId,
    proposed_parent: Option<CollectionId>,
) -> Result<(), ValidationError> {
    let Some(parent_id) = proposed_parent else {
        return Ok(());
    };

    if parent_id == child_id {
        return Err(ValidationError::SelfParent {
            collection_id: child_id,
        });
    }

    if !index.contains(parent_id) {
        return Err(ValidationError::UnknownParent { parent_id });
    }

    if unassignable_targets(index, child_id).contains(&parent_id) {
        tracing::debug!(
            "Rejected assigning {} under its descendant {}",
            child_id,
            parent_id
        );
        return Err(ValidationError::DescendantCycle {
            collection_id: child_id,
            parent_id,
        });
    }

    Ok(())
}
