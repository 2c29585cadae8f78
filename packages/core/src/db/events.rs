//! Hierarchy Events
//!
//! Events emitted by [`ReparentService`](crate::services::ReparentService)
//! after each committed edge mutation, over a tokio broadcast channel.
//! Subscribers (a host cache, a UI bridge) can react without coupling to
//! the storage layer.
//!
//! Events carry an optional `source_client_id` so a client can ignore the
//! echoes of its own writes.

use crate::models::CollectionId;
use serde::{Deserialize, Serialize};

/// One parent/child link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyRelationship {
    pub parent_id: CollectionId,
    pub child_id: CollectionId,
}

/// Committed hierarchy changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HierarchyEvent {
    /// A collection was placed under a parent (created or moved)
    #[serde(rename_all = "camelCase")]
    ParentAssigned {
        relationship: HierarchyRelationship,
        source_client_id: Option<String>,
    },

    /// A collection became a root
    #[serde(rename_all = "camelCase")]
    Detached {
        child_id: CollectionId,
        source_client_id: Option<String>,
    },

    /// Children of a deleted collection became roots
    #[serde(rename_all = "camelCase")]
    ChildrenPromoted {
        former_parent_id: CollectionId,
        child_ids: Vec<CollectionId>,
        source_client_id: Option<String>,
    },
}

impl HierarchyEvent {
    /// Event type string, for logging and client dispatch
    pub fn event_type(&self) -> &str {
        match self {
            HierarchyEvent::ParentAssigned { .. } => "hierarchy:parent-assigned",
            HierarchyEvent::Detached { .. } => "hierarchy:detached",
            HierarchyEvent::ChildrenPromoted { .. } => "hierarchy:children-promoted",
        }
    }

    pub fn source_client_id(&self) -> Option<&str> {
        match self {
            HierarchyEvent::ParentAssigned {
                source_client_id, ..
            }
            | HierarchyEvent::Detached {
                source_client_id, ..
            }
            | HierarchyEvent::ChildrenPromoted {
                source_client_id, ..
            } => source_client_id.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The JSON shape is consumed by clients outside this crate; keep it flat
    /// and internally tagged.
    #[test]
    fn test_event_serialization_contract() {
        let event = HierarchyEvent::ParentAssigned {
            relationship: HierarchyRelationship {
                parent_id: 1,
                child_id: 2,
            },
            source_client_id: Some("client-a".to_string()),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "parentAssigned");
        assert_eq!(json["relationship"]["parentId"], 1);
        assert_eq!(json["relationship"]["childId"], 2);
        assert_eq!(json["sourceClientId"], "client-a");

        let parsed: HierarchyEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_event_type_and_source() {
        let event = HierarchyEvent::ChildrenPromoted {
            former_parent_id: 4,
            child_ids: vec![5, 6],
            source_client_id: None,
        };
        assert_eq!(event.event_type(), "hierarchy:children-promoted");
        assert_eq!(event.source_client_id(), None);
    }
}
