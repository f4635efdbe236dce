//! `http` step executor (§4.5): issues a single HTTP request through the
//! shared allow-list, the same gate provisioners route their calls through.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use orch_core::{OrchError, StepContext, StepExecutor};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::allowlist::UrlAllowList;

#[derive(Deserialize)]
struct HttpConfig {
    #[serde(default = "default_method")]
    method: String,
    url: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

pub struct HttpExecutor {
    client: Client,
    allow_list: Arc<UrlAllowList>,
}

impl HttpExecutor {
    pub fn new(client: Client, allow_list: Arc<UrlAllowList>) -> Self {
        Self { client, allow_list }
    }
}

#[async_trait]
impl StepExecutor for HttpExecutor {
    fn step_type(&self) -> &'static str {
        "http"
    }

    async fn execute(&self, _ctx: &StepContext, config: &Value) -> Result<Value, OrchError> {
        let cfg: HttpConfig = serde_json::from_value(config.clone())
            .map_err(|e| OrchError::Validation(format!("http step config: {e}")))?;

        let url = self.allow_list.check(&cfg.url)?;
        let method = cfg.method
                         .parse::<reqwest::Method>()
                         .map_err(|_| OrchError::Validation(format!("unsupported HTTP method '{}'", cfg.method)))?;

        let mut request = self.client.request(method, url);
        for (key, value) in &cfg.headers {
            request = request.header(key, value);
        }
        if let Some(body) = &cfg.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| OrchError::External(format!("http step: {e}")))?;
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!(text));

        if status >= 400 {
            return Err(OrchError::External(format!("http step received status {status}: {text}")));
        }

        Ok(json!({ "status": status, "body": body }))
    }
}
