//! Score-spec data model (§3, §6).
//!
//! A `Spec` is immutable once submitted: resubmission under the same
//! `(namespace, name)` produces a new row only when the raw document differs;
//! see `orch-core::resource_manager` for how resources are reconciled against
//! it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A container declared under `containers:` in the Score document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContainerSpec {
    pub image: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// A resource declared under `resources:` in the Score document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceSpec {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl ResourceSpec {
    /// The configuration handed to a provisioner/provider workflow: `params`
    /// with `properties` merged on top, key by key, when both are objects.
    /// A non-object side is kept whole under its own key instead of being
    /// silently dropped.
    pub fn merged_configuration(&self) -> serde_json::Value {
        match (&self.params, &self.properties) {
            (serde_json::Value::Null, p) => p.clone(),
            (p, serde_json::Value::Null) => p.clone(),
            (serde_json::Value::Object(params), serde_json::Value::Object(properties)) => {
                let mut merged = params.clone();
                for (k, v) in properties {
                    merged.insert(k.clone(), v.clone());
                }
                serde_json::Value::Object(merged)
            }
            (params, properties) => {
                serde_json::json!({ "params": params, "properties": properties })
            }
        }
    }
}

/// A step inside an inline `workflow:` block. Mirrors
/// `orch_core::workflow::StepDefinitionConfig` but lives here because it is
/// part of the wire format of a Score spec, not an execution-time type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InlineStep {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub parallel_group: Option<String>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff_seconds: u64,
}

fn default_max_attempts() -> u32 {
    1
}

/// The parsed body of a Score document: `apiVersion`, `metadata.name`,
/// `containers`, `resources`, and an optional inline `workflow`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParsedSpec {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub containers: HashMap<String, ContainerSpec>,
    #[serde(default)]
    pub resources: HashMap<String, ResourceSpec>,
    #[serde(default)]
    pub workflow: Option<Vec<InlineStep>>,
}

/// Raw Score YAML as submitted, for `serde_yaml::from_str` by the (external)
/// parser adapter. Kept distinct from `ParsedSpec` so callers that only have
/// the document text can still construct one.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreDocument {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    pub metadata: ScoreMetadata,
    #[serde(default)]
    pub containers: HashMap<String, ContainerSpec>,
    #[serde(default)]
    pub resources: HashMap<String, ResourceSpec>,
    #[serde(default)]
    pub workflow: Option<Vec<InlineStep>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreMetadata {
    pub name: String,
}

impl From<ScoreDocument> for ParsedSpec {
    fn from(doc: ScoreDocument) -> Self {
        ParsedSpec { api_version: doc.api_version,
                     containers: doc.containers,
                     resources: doc.resources,
                     workflow: doc.workflow }
    }
}

/// An immutable application specification, as persisted (§3 "Spec").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    pub id: Uuid,
    pub name: String,
    pub version: i32,
    pub raw_document: String,
    pub parsed: ParsedSpec,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Spec {
    pub fn new(name: impl Into<String>, raw_document: String, parsed: ParsedSpec, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(),
               name: name.into(),
               version: 1,
               raw_document,
               parsed,
               owner: owner.into(),
               created_at: now,
               updated_at: now }
    }
}
