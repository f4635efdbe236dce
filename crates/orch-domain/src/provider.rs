//! Provider registry data model (§4.2, C5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a provider manifest was loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderSource {
    Filesystem { path: String },
    Git { repository: String, git_ref: String },
}

/// The raw shape of a `provider.yaml` manifest on disk, before it is
/// registered (i.e. before exclusivity is checked).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderManifest {
    pub name: String,
    pub resource_types: Vec<String>,
    pub workflow_file: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A registered provider (§4.2): one provider owns a disjoint set of resource
/// types (invariant I4), enforced by `orch-providers::registry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub resource_types: Vec<String>,
    pub workflow_file: String,
    pub source: ProviderSource,
    pub registered_at: DateTime<Utc>,
}

impl Provider {
    pub fn from_manifest(manifest: ProviderManifest, source: ProviderSource) -> Self {
        Self { id: Uuid::new_v4(),
               name: manifest.name,
               resource_types: manifest.resource_types,
               workflow_file: manifest.workflow_file,
               source,
               registered_at: Utc::now() }
    }
}

/// Error detail surfaced when a manifest claims a resource type another
/// provider already owns (SPEC_FULL §C.4: "record why").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConflict {
    pub resource_type: String,
    pub incoming_provider: String,
    pub existing_provider: String,
}
