//! Resource lifecycle data model (§3, §4.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed set of lifecycle states (§4.1). The transition graph itself
/// lives in `orch-policies::transition` — this enum only names the states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Requested,
    Provisioning,
    Active,
    Scaling,
    Updating,
    Degraded,
    Terminating,
    Terminated,
    Failed,
}

impl ResourceState {
    /// Only `terminated` has no outgoing edges in the transition graph
    /// (§4.1).
    pub fn is_terminal(self) -> bool {
        matches!(self, ResourceState::Terminated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceState::Requested => "requested",
            ResourceState::Provisioning => "provisioning",
            ResourceState::Active => "active",
            ResourceState::Scaling => "scaling",
            ResourceState::Updating => "updating",
            ResourceState::Degraded => "degraded",
            ResourceState::Terminating => "terminating",
            ResourceState::Terminated => "terminated",
            ResourceState::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ResourceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(ResourceState::Requested),
            "provisioning" => Ok(ResourceState::Provisioning),
            "active" => Ok(ResourceState::Active),
            "scaling" => Ok(ResourceState::Scaling),
            "updating" => Ok(ResourceState::Updating),
            "degraded" => Ok(ResourceState::Degraded),
            "terminating" => Ok(ResourceState::Terminating),
            "terminated" => Ok(ResourceState::Terminated),
            "failed" => Ok(ResourceState::Failed),
            other => Err(format!("unrecognized resource state '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Unknown,
    Healthy,
    Degraded,
    Unhealthy,
}

impl Default for HealthStatus {
    fn default() -> Self {
        HealthStatus::Unknown
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(HealthStatus::Unknown),
            "healthy" => Ok(HealthStatus::Healthy),
            "degraded" => Ok(HealthStatus::Degraded),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            other => Err(format!("unrecognized health status '{other}'")),
        }
    }
}

/// How a resource is served: provisioned by us (`native`), handed off to
/// another system that owns its lifecycle (`delegated`), or merely
/// referenced for graph/visibility purposes (`external`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Native,
    Delegated,
    External,
}

impl Default for ResourceKind {
    fn default() -> Self {
        ResourceKind::Native
    }
}

/// A small UI-facing fact surfaced about a resource (e.g. a connection
/// string or dashboard link), attached by a provisioner on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hint {
    #[serde(rename = "type")]
    pub hint_type: String,
    pub label: String,
    pub value: String,
    pub icon: Option<String>,
}

/// A single resource declared by an application's spec, tracked across its
/// lifecycle. `configuration_hash` is the blake3 canonical-JSON hash of
/// `configuration`, used to detect drift on spec resubmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInstance {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub resource_type: String,
    pub state: ResourceState,
    pub health_status: HealthStatus,
    pub kind: ResourceKind,
    pub configuration: serde_json::Value,
    pub configuration_hash: String,
    pub provider_metadata: serde_json::Value,
    pub error_message: Option<String>,
    pub hints: Vec<Hint>,
    pub external_state: Option<serde_json::Value>,
    pub provider_id: Option<Uuid>,
    pub reference_url: Option<String>,
    pub workflow_execution_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceInstance {
    pub fn new(application_id: Uuid, name: impl Into<String>, resource_type: impl Into<String>,
               configuration: serde_json::Value, configuration_hash: String)
               -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(),
               application_id,
               name: name.into(),
               resource_type: resource_type.into(),
               state: ResourceState::Requested,
               health_status: HealthStatus::Unknown,
               kind: ResourceKind::Native,
               configuration,
               configuration_hash,
               provider_metadata: serde_json::Value::Null,
               error_message: None,
               hints: Vec::new(),
               external_state: None,
               provider_id: None,
               reference_url: None,
               workflow_execution_id: None,
               created_at: now,
               updated_at: now }
    }
}

/// Append-only audit row for every state change (§4.1 "audit trail").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStateTransition {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub from_state: Option<ResourceState>,
    pub to_state: ResourceState,
    pub reason: String,
    pub triggered_by: String,
    pub metadata: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl ResourceStateTransition {
    pub fn new(resource_id: Uuid, from_state: Option<ResourceState>, to_state: ResourceState,
               reason: impl Into<String>, triggered_by: impl Into<String>, metadata: serde_json::Value)
               -> Self {
        Self { id: Uuid::new_v4(),
               resource_id,
               from_state,
               to_state,
               reason: reason.into(),
               triggered_by: triggered_by.into(),
               metadata,
               occurred_at: Utc::now() }
    }
}

/// A point-in-time health probe result (supplemented feature, SPEC_FULL §C.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceHealthCheck {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ResourceHealthCheck {
    pub fn new(resource_id: Uuid, status: HealthStatus, message: Option<String>) -> Self {
        Self { id: Uuid::new_v4(), resource_id, status, message, checked_at: Utc::now() }
    }
}

/// An application: the top-level unit a Score spec resolves into (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub spec_id: Uuid,
    pub name: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn new(spec_id: Uuid, name: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(), spec_id, name: name.into(), owner: owner.into(), created_at: now, updated_at: now }
    }
}
