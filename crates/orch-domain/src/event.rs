//! Event bus payload types (§4.7). The `EventType` set is closed — adding a
//! variant here is the only way a new event can exist.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SpecSubmitted,
    ResourceCreated,
    ResourceRequested,
    ResourceProvisioning,
    ResourceActive,
    ResourceFailed,
    ResourceTerminated,
    ProviderResolved,
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    StepStarted,
    StepCompleted,
    StepFailed,
    StepProgress,
    DeploymentCompleted,
    DeploymentFailed,
}

impl EventType {
    /// The dotted wire name used in filters and SSE payloads, e.g.
    /// `resource.active`.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            EventType::SpecSubmitted => "spec.submitted",
            EventType::ResourceCreated => "resource.created",
            EventType::ResourceRequested => "resource.requested",
            EventType::ResourceProvisioning => "resource.provisioning",
            EventType::ResourceActive => "resource.active",
            EventType::ResourceFailed => "resource.failed",
            EventType::ResourceTerminated => "resource.terminated",
            EventType::ProviderResolved => "provider.resolved",
            EventType::WorkflowStarted => "workflow.started",
            EventType::WorkflowCompleted => "workflow.completed",
            EventType::WorkflowFailed => "workflow.failed",
            EventType::StepStarted => "step.started",
            EventType::StepCompleted => "step.completed",
            EventType::StepFailed => "step.failed",
            EventType::StepProgress => "step.progress",
            EventType::DeploymentCompleted => "deployment.completed",
            EventType::DeploymentFailed => "deployment.failed",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        Some(match s {
            "spec.submitted" => EventType::SpecSubmitted,
            "resource.created" => EventType::ResourceCreated,
            "resource.requested" => EventType::ResourceRequested,
            "resource.provisioning" => EventType::ResourceProvisioning,
            "resource.active" => EventType::ResourceActive,
            "resource.failed" => EventType::ResourceFailed,
            "resource.terminated" => EventType::ResourceTerminated,
            "provider.resolved" => EventType::ProviderResolved,
            "workflow.started" => EventType::WorkflowStarted,
            "workflow.completed" => EventType::WorkflowCompleted,
            "workflow.failed" => EventType::WorkflowFailed,
            "step.started" => EventType::StepStarted,
            "step.completed" => EventType::StepCompleted,
            "step.failed" => EventType::StepFailed,
            "step.progress" => EventType::StepProgress,
            "deployment.completed" => EventType::DeploymentCompleted,
            "deployment.failed" => EventType::DeploymentFailed,
            _ => return None,
        })
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: serde::Serializer
    {
        serializer.serialize_str(self.as_wire_str())
    }
}

/// A single bus event (§3 "Event").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub app_name: Option<String>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub payload: HashMap<String, serde_json::Value>,
}

impl Event {
    pub fn new(event_type: EventType, source: impl Into<String>, app_name: Option<String>,
               payload: HashMap<String, serde_json::Value>)
               -> Self {
        Self { id: Uuid::new_v4(), event_type, app_name, source: source.into(), timestamp: Utc::now(), payload }
    }
}

/// A subscriber's filter: match on app name and/or a set of event types. An
/// empty `types` set matches every type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub app_name: Option<String>,
    #[serde(default)]
    pub types: Vec<EventType>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref app) = self.app_name {
            if event.app_name.as_deref() != Some(app.as_str()) {
                return false;
            }
        }
        self.types.is_empty() || self.types.contains(&event.event_type)
    }
}
