//! `admin-config.yaml` shape (§6). Loaded once at startup via
//! `serde_yaml::from_str`, reloadable under a write lock via
//! `POST /api/admin/reload` (SPEC_FULL §C.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderSourceKind {
    Filesystem,
    Git,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfigEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderSourceKind,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GiteaIntegration {
    pub url: String,
    pub org: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArgoCdIntegration {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VaultIntegration {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IntegrationsConfig {
    pub gitea: Option<GiteaIntegration>,
    pub argocd: Option<ArgoCdIntegration>,
    pub vault: Option<VaultIntegration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_workflows: usize,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_concurrent() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { poll_interval_seconds: default_poll_interval(), max_concurrent_workflows: default_max_concurrent() }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfigEntry>,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AdminConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}
