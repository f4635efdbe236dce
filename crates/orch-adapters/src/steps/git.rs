//! `git` step executor (§4.5): clones or fetches a repository at a ref into
//! a checkout path. The remote URL is checked against the shared allow-list
//! when it is an `http(s)` URL; SSH/`git@` remotes bypass the HTTP
//! allow-list entirely and rely on the host's own SSH key trust.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use orch_core::{OrchError, StepContext, StepExecutor};
use serde::Deserialize;
use serde_json::Value;

use crate::allowlist::UrlAllowList;
use crate::process::{run, ProcessSpec};

#[derive(Deserialize)]
struct GitConfig {
    repository: String,
    #[serde(default = "default_ref")]
    git_ref: String,
    checkout_path: String,
}

fn default_ref() -> String {
    "main".to_string()
}

pub struct GitExecutor {
    allow_list: Arc<UrlAllowList>,
}

impl GitExecutor {
    pub fn new(allow_list: Arc<UrlAllowList>) -> Self {
        Self { allow_list }
    }
}

#[async_trait]
impl StepExecutor for GitExecutor {
    fn step_type(&self) -> &'static str {
        "git"
    }

    async fn execute(&self, _ctx: &StepContext, config: &Value) -> Result<Value, OrchError> {
        let cfg: GitConfig = serde_json::from_value(config.clone())
            .map_err(|e| OrchError::Validation(format!("git step config: {e}")))?;

        if cfg.repository.starts_with("http://") || cfg.repository.starts_with("https://") {
            self.allow_list.check(&cfg.repository)?;
        }

        run(ProcessSpec { program: "git",
                          args: vec!["clone".into(), "--branch".into(), cfg.git_ref, cfg.repository,
                                     cfg.checkout_path],
                          cwd: None,
                          env: HashMap::new(),
                          stdin: None }).await
    }
}
