//! Provisioner contract (§4.5 "Each resource type is served by a
//! provisioner offering `Provision`, `Deprovision`, and `GetStatus`
//! operations. They are registered by name at startup and matched by
//! `resource.type`.").
//!
//! Concrete provisioners (`kubernetes`, `gitea-repo`, `argocd-app`) live in
//! `orch-adapters`; this crate only defines the trait and the by-type
//! registry `ResourceManager::Provision`/`Deprovision` dispatch through.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::OrchError;

#[async_trait]
pub trait Provisioner: Send + Sync {
    /// The `resource.type` string this provisioner serves, e.g.
    /// `"kubernetes-deployment"`.
    fn resource_type(&self) -> &'static str;

    /// Creates or updates the underlying infrastructure. On success,
    /// returns provider metadata to store on the resource; the caller
    /// (`ResourceManager::record_provision_result`) handles the lifecycle
    /// transition.
    async fn provision(&self, resource_id: uuid::Uuid, configuration: &Value) -> Result<Value, OrchError>;

    /// Tears down the underlying infrastructure. Idempotent: deprovisioning
    /// an already-gone resource is success, not an error.
    async fn deprovision(&self, resource_id: uuid::Uuid, provider_metadata: &Value) -> Result<(), OrchError>;

    /// Polls the live status of the underlying infrastructure, used by
    /// health checks (§4.1 "GetStatus on a provisioner is the natural
    /// source of a health check").
    async fn get_status(&self, resource_id: uuid::Uuid, provider_metadata: &Value) -> Result<Value, OrchError>;
}

#[derive(Default, Clone)]
pub struct ProvisionerRegistry {
    provisioners: HashMap<String, Arc<dyn Provisioner>>,
}

impl ProvisionerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provisioner: Arc<dyn Provisioner>) {
        self.provisioners.insert(provisioner.resource_type().to_string(), provisioner);
    }

    pub fn resolve(&self, resource_type: &str) -> Result<Arc<dyn Provisioner>, OrchError> {
        self.provisioners
            .get(resource_type)
            .cloned()
            .ok_or_else(|| OrchError::NotFound(format!("no provisioner registered for resource type '{resource_type}'")))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct NoopProvisioner;

    #[async_trait]
    impl Provisioner for NoopProvisioner {
        fn resource_type(&self) -> &'static str {
            "noop"
        }

        async fn provision(&self, _resource_id: uuid::Uuid, _configuration: &Value) -> Result<Value, OrchError> {
            Ok(json!({"provisioned": true}))
        }

        async fn deprovision(&self, _resource_id: uuid::Uuid, _provider_metadata: &Value) -> Result<(), OrchError> {
            Ok(())
        }

        async fn get_status(&self, _resource_id: uuid::Uuid, _provider_metadata: &Value) -> Result<Value, OrchError> {
            Ok(json!({"status": "ok"}))
        }
    }

    #[tokio::test]
    async fn registers_and_resolves_by_resource_type() {
        let mut registry = ProvisionerRegistry::new();
        registry.register(Arc::new(NoopProvisioner));

        let provisioner = registry.resolve("noop").unwrap();
        let out = provisioner.provision(uuid::Uuid::new_v4(), &json!({})).await.unwrap();
        assert_eq!(out, json!({"provisioned": true}));
    }

    #[test]
    fn unregistered_type_is_not_found() {
        let registry = ProvisionerRegistry::new();
        let err = match registry.resolve("missing") {
            Err(e) => e,
            Ok(_) => panic!("expected resolve to fail"),
        };
        assert!(matches!(err, OrchError::NotFound(_)));
    }
}
