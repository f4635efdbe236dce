//! Dependency-graph projection (§3 "derived", SPEC_FULL §C.2).
//!
//! Nodes and edges are not sources of truth — they are rebuilt from
//! applications, resources, and providers by `GraphProjection::rebuild`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Application,
    Resource,
    Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: Uuid,
    pub node_type: NodeType,
    pub ref_id: Uuid,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Declares,
    ProvisionedBy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: Uuid,
    pub from_node: Uuid,
    pub to_node: Uuid,
    pub edge_type: EdgeType,
}

/// A free-form annotation attached to a node by an operator (named in §4.6's
/// `graph_annotations` table; not elaborated on elsewhere in the spec).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphAnnotation {
    pub id: Uuid,
    pub node_id: Uuid,
    pub text: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl GraphAnnotation {
    pub fn new(node_id: Uuid, text: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), node_id, text: text.into(), created_by: created_by.into(), created_at: Utc::now() }
    }
}
