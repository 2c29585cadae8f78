//! Reparent Service
//!
//! Applies the host's collection lifecycle to the edge table. A collection is
//! either a root (no edge, or an edge with the root sentinel) or a child (an
//! edge naming its parent):
//!
//! - `before_save` validates a submitted parent; a failure blocks the save
//! - `after_save` commits the submitted parent, or only refreshes the cached
//!   name when the form did not carry the parent field
//! - `after_delete` removes the collection's edge and promotes its children
//!   to roots (never cascades)
//!
//! ## Event Emission
//!
//! With `with_events()`, every committed mutation is broadcast as a
//! [`HierarchyEvent`] tagged with the client id. Send failures (no
//! subscribers) are ignored.

use crate::db::{EdgeStore, HierarchyEvent, HierarchyRelationship};
use crate::models::{CollectionId, CollectionRecord, SubmittedParent, TreeEdge, ValidationError};
use crate::services::collection_index::{CollectionIndex, IndexOptions};
use crate::services::error::HierarchyError;
use crate::services::validator;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Parse the parent field of a submitted form
///
/// `None` means the form did not carry the field at all.
pub fn parse_submitted_parent(
    raw: Option<&str>,
) -> Result<Option<SubmittedParent>, ValidationError> {
    raw.map(SubmittedParent::from_form_value).transpose()
}

/// What `after_save` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No parent submitted; `updated` is false when the collection has no edge
    NameRefreshed { updated: bool },
    /// Root submitted; `removed` is false when there was no edge
    Detached { removed: bool },
    /// Parent submitted and committed
    Assigned(TreeEdge),
}

/// Lifecycle hooks for collection saves and deletes
pub struct ReparentService<S: EdgeStore + ?Sized> {
    store: Arc<S>,
    /// Optional event sender for broadcasting hierarchy events
    event_tx: Option<broadcast::Sender<HierarchyEvent>>,
    /// Optional client identifier for event source tracking
    client_id: Option<String>,
}

impl<S: EdgeStore + ?Sized> ReparentService<S> {
    /// Create a ReparentService without event emission
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            event_tx: None,
            client_id: None,
        }
    }

    /// Create a ReparentService that broadcasts committed mutations
    pub fn with_events(
        store: Arc<S>,
        event_tx: broadcast::Sender<HierarchyEvent>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            store,
            event_tx: Some(event_tx),
            client_id,
        }
    }

    fn emit_event(&self, event: HierarchyEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Validate a submitted parent before the host saves the record
    ///
    /// Nothing is written. `None` (field absent) and `Root` always pass.
    pub async fn before_save(
        &self,
        record: &CollectionRecord,
        submitted: Option<SubmittedParent>,
    ) -> Result<(), HierarchyError> {
        let Some(SubmittedParent::Parent(parent_id)) = submitted else {
            return Ok(());
        };

        let index = CollectionIndex::load(self.store.as_ref(), IndexOptions::unfiltered()).await?;
        validator::validate(&index, record.id, Some(parent_id)).map_err(|err| {
            tracing::debug!(
                "Blocked save of collection {}: {} ({})",
                record.id,
                err,
                err.code()
            );
            HierarchyError::from(err)
        })
    }

    /// Commit the submitted parent after the host saved the record
    pub async fn after_save(
        &self,
        record: &CollectionRecord,
        submitted: Option<SubmittedParent>,
    ) -> Result<SaveOutcome, HierarchyError> {
        let name = record.display_title();

        match submitted {
            None => {
                let updated = self.store.refresh_name(record.id, name).await?;
                Ok(SaveOutcome::NameRefreshed { updated })
            }
            Some(SubmittedParent::Root) => {
                let removed = self.store.delete_by_child(record.id).await?;
                if removed {
                    tracing::debug!("Detached collection {} to root", record.id);
                    self.emit_event(HierarchyEvent::Detached {
                        child_id: record.id,
                        source_client_id: self.client_id.clone(),
                    });
                }
                Ok(SaveOutcome::Detached { removed })
            }
            Some(SubmittedParent::Parent(parent_id)) => {
                let edge = self.store.upsert(record.id, parent_id, name).await?;
                self.emit_event(HierarchyEvent::ParentAssigned {
                    relationship: HierarchyRelationship {
                        parent_id,
                        child_id: record.id,
                    },
                    source_client_id: self.client_id.clone(),
                });
                Ok(SaveOutcome::Assigned(edge))
            }
        }
    }

    /// Remove a deleted collection from the hierarchy
    ///
    /// Returns the children promoted to roots.
    pub async fn after_delete(
        &self,
        id: CollectionId,
    ) -> Result<Vec<CollectionId>, HierarchyError> {
        let removed = self.store.delete_by_child(id).await?;
        let promoted = self.store.promote_children_to_root(id).await?;

        if removed {
            self.emit_event(HierarchyEvent::Detached {
                child_id: id,
                source_client_id: self.client_id.clone(),
            });
        }

        if !promoted.is_empty() {
            tracing::debug!(
                "Collection {} deleted, promoted {:?} to root",
                id,
                promoted
            );
            self.emit_event(HierarchyEvent::ChildrenPromoted {
                former_parent_id: id,
                child_ids: promoted.clone(),
                source_client_id: self.client_id.clone(),
            });
        }

        Ok(promoted)
    }
}
