//! `gitea-repo` provisioner (§4.5): create/delete repositories via the
//! Gitea REST API. Credentials come from the admin configuration's
//! `integrations.gitea` block, passed in at construction rather than read
//! from the resource configuration.

use async_trait::async_trait;
use orch_core::{OrchError, Provisioner};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::allowlist::UrlAllowList;

pub struct GiteaRepoProvisioner {
    client: Client,
    allow_list: Arc<UrlAllowList>,
    base_url: String,
    org: String,
    username: String,
    password: String,
}

impl GiteaRepoProvisioner {
    pub fn new(client: Client, allow_list: Arc<UrlAllowList>, base_url: String, org: String, username: String,
               password: String)
               -> Self {
        Self { client, allow_list, base_url, org, username, password }
    }
}

#[async_trait]
impl Provisioner for GiteaRepoProvisioner {
    fn resource_type(&self) -> &'static str {
        "gitea-repo"
    }

    async fn provision(&self, _resource_id: Uuid, configuration: &Value) -> Result<Value, OrchError> {
        let name = configuration.get("name")
                                 .and_then(Value::as_str)
                                 .ok_or_else(|| OrchError::Validation("gitea-repo provisioner requires 'name'".into()))?;

        let create_url = format!("{}/api/v1/orgs/{}/repos", self.base_url, self.org);
        let url = self.allow_list.check(&create_url)?;

        let private = configuration.get("private").and_then(Value::as_bool).unwrap_or(true);
        let response = self.client
                            .post(url)
                            .basic_auth(&self.username, Some(&self.password))
                            .json(&json!({ "name": name, "private": private }))
                            .send()
                            .await
                            .map_err(|e| OrchError::External(format!("gitea-repo provision: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OrchError::External(format!("gitea create repo failed ({status}): {body}")));
        }

        let body: Value = response.json().await.unwrap_or(json!({}));
        Ok(json!({ "repo_name": name, "org": self.org, "clone_url": body.get("clone_url") }))
    }

    async fn deprovision(&self, _resource_id: Uuid, provider_metadata: &Value) -> Result<(), OrchError> {
        let name = provider_metadata.get("repo_name")
                                     .and_then(Value::as_str)
                                     .ok_or_else(|| OrchError::Validation("missing 'repo_name' in provider metadata".into()))?;
        let delete_url = format!("{}/api/v1/repos/{}/{}", self.base_url, self.org, name);
        let url = self.allow_list.check(&delete_url)?;

        let response = self.client
                            .delete(url)
                            .basic_auth(&self.username, Some(&self.password))
                            .send()
                            .await
                            .map_err(|e| OrchError::External(format!("gitea-repo deprovision: {e}")))?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(OrchError::External(format!("gitea delete repo failed ({})", response.status())));
        }
        Ok(())
    }

    async fn get_status(&self, _resource_id: Uuid, provider_metadata: &Value) -> Result<Value, OrchError> {
        let name = provider_metadata.get("repo_name")
                                     .and_then(Value::as_str)
                                     .ok_or_else(|| OrchError::Validation("missing 'repo_name' in provider metadata".into()))?;
        let get_url = format!("{}/api/v1/repos/{}/{}", self.base_url, self.org, name);
        let url = self.allow_list.check(&get_url)?;

        let response = self.client
                            .get(url)
                            .basic_auth(&self.username, Some(&self.password))
                            .send()
                            .await
                            .map_err(|e| OrchError::External(format!("gitea-repo get_status: {e}")))?;

        let exists = response.status().is_success();
        Ok(json!({ "exists": exists }))
    }
}
