//! `argocd-app` provisioner (§4.5): authenticate, create or delete an
//! ArgoCD Application.

use async_trait::async_trait;
use orch_core::{OrchError, Provisioner};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::allowlist::UrlAllowList;

pub struct ArgoCdAppProvisioner {
    client: Client,
    allow_list: Arc<UrlAllowList>,
    base_url: String,
    username: String,
    password: String,
}

impl ArgoCdAppProvisioner {
    pub fn new(client: Client, allow_list: Arc<UrlAllowList>, base_url: String, username: String, password: String)
               -> Self {
        Self { client, allow_list, base_url, username, password }
    }

    async fn authenticate(&self) -> Result<String, OrchError> {
        let url = self.allow_list.check(&format!("{}/api/v1/session", self.base_url))?;
        let response = self.client
                            .post(url)
                            .json(&json!({ "username": self.username, "password": self.password }))
                            .send()
                            .await
                            .map_err(|e| OrchError::External(format!("argocd-app authenticate: {e}")))?;
        if !response.status().is_success() {
            return Err(OrchError::External(format!("argocd-app authenticate failed ({})", response.status())));
        }
        let body: Value = response.json().await.unwrap_or(json!({}));
        body.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| OrchError::External("argocd-app authenticate: response missing 'token'".into()))
    }
}

#[async_trait]
impl Provisioner for ArgoCdAppProvisioner {
    fn resource_type(&self) -> &'static str {
        "argocd-app"
    }

    async fn provision(&self, _resource_id: Uuid, configuration: &Value) -> Result<Value, OrchError> {
        let name = configuration.get("name")
                                 .and_then(Value::as_str)
                                 .ok_or_else(|| OrchError::Validation("argocd-app provisioner requires 'name'".into()))?;
        let repo_url = configuration.get("repo_url")
                                     .and_then(Value::as_str)
                                     .ok_or_else(|| OrchError::Validation("argocd-app provisioner requires 'repo_url'".into()))?;
        let path = configuration.get("path").and_then(Value::as_str).unwrap_or(".");
        let namespace = configuration.get("namespace").and_then(Value::as_str).unwrap_or("default");

        let token = self.authenticate().await?;
        let url = self.allow_list.check(&format!("{}/api/v1/applications", self.base_url))?;

        let response = self.client
                            .post(url)
                            .bearer_auth(token)
                            .json(&json!({
                                "metadata": { "name": name },
                                "spec": {
                                    "source": { "repoURL": repo_url, "path": path },
                                    "destination": { "namespace": namespace }
                                }
                            }))
                            .send()
                            .await
                            .map_err(|e| OrchError::External(format!("argocd-app provision: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OrchError::External(format!("argocd create application failed ({status}): {body}")));
        }

        Ok(json!({ "app_name": name }))
    }

    async fn deprovision(&self, _resource_id: Uuid, provider_metadata: &Value) -> Result<(), OrchError> {
        let name = provider_metadata.get("app_name")
                                     .and_then(Value::as_str)
                                     .ok_or_else(|| OrchError::Validation("missing 'app_name' in provider metadata".into()))?;
        let token = self.authenticate().await?;
        let url = self.allow_list.check(&format!("{}/api/v1/applications/{}", self.base_url, name))?;

        let response = self.client
                            .delete(url)
                            .bearer_auth(token)
                            .send()
                            .await
                            .map_err(|e| OrchError::External(format!("argocd-app deprovision: {e}")))?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(OrchError::External(format!("argocd delete application failed ({})", response.status())));
        }
        Ok(())
    }

    async fn get_status(&self, _resource_id: Uuid, provider_metadata: &Value) -> Result<Value, OrchError> {
        let name = provider_metadata.get("app_name")
                                     .and_then(Value::as_str)
                                     .ok_or_else(|| OrchError::Validation("missing 'app_name' in provider metadata".into()))?;
        let token = self.authenticate().await?;
        let url = self.allow_list.check(&format!("{}/api/v1/applications/{}", self.base_url, name))?;

        let response = self.client
                            .get(url)
                            .bearer_auth(token)
                            .send()
                            .await
                            .map_err(|e| OrchError::External(format!("argocd-app get_status: {e}")))?;
        let body: Value = response.json().await.unwrap_or(json!({}));
        let health = body.pointer("/status/health/status").cloned().unwrap_or(json!("Unknown"));
        let sync = body.pointer("/status/sync/status").cloned().unwrap_or(json!("Unknown"));
        Ok(json!({ "health": health, "sync": sync }))
    }
}
