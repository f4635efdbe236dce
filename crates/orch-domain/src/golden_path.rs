//! `goldenpaths.yaml` shape (§6). Accepts both the full form and a shorthand
//! `name: path` mapping, normalised into `GoldenPath` on load.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoldenPath {
    pub name: String,
    pub workflow: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub estimated_duration: Option<String>,
    #[serde(default)]
    pub required_params: Vec<String>,
    #[serde(default)]
    pub optional_params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct FullGoldenPathEntry {
    workflow: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    estimated_duration: Option<String>,
    #[serde(default)]
    required_params: Vec<String>,
    #[serde(default)]
    optional_params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum GoldenPathEntry {
    Shorthand(String),
    Full(FullGoldenPathEntry),
}

/// The whole `goldenpaths.yaml` document: a map of name to entry, in either
/// the shorthand (`name: path/to/workflow.yaml`) or full form.
#[derive(Debug, Clone, Deserialize)]
pub struct GoldenPathsConfig(HashMap<String, GoldenPathEntry>);

impl GoldenPathsConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    pub fn into_golden_paths(self) -> Vec<GoldenPath> {
        self.0
            .into_iter()
            .map(|(name, entry)| match entry {
                GoldenPathEntry::Shorthand(workflow) => GoldenPath { name,
                                                                      workflow,
                                                                      description: String::new(),
                                                                      category: String::new(),
                                                                      tags: Vec::new(),
                                                                      estimated_duration: None,
                                                                      required_params: Vec::new(),
                                                                      optional_params: HashMap::new() },
                GoldenPathEntry::Full(full) => GoldenPath { name,
                                                             workflow: full.workflow,
                                                             description: full.description,
                                                             category: full.category,
                                                             tags: full.tags,
                                                             estimated_duration: full.estimated_duration,
                                                             required_params: full.required_params,
                                                             optional_params: full.optional_params },
            })
            .collect()
    }
}
