//! orch-providers: provider manifest loading, capability index, and
//! resolution (§4.2, SPEC_FULL §A "C5").
//!
//! Loading reads `AdminConfig.providers` in file order and is otherwise
//! side-effect free; `ProviderRegistry` is the stateful piece other crates
//! depend on (`orch-infra`'s engine loop resolves through it on every
//! `requested` resource, `orch-cli` triggers reloads).

pub mod loader;
pub mod registry;

use orch_core::OrchError;
use orch_domain::admin_config::{ProviderConfigEntry, ProviderSourceKind};
use orch_domain::Provider;

pub use registry::{ProviderIndex, ProviderRegistry};

/// Loads every enabled entry in `entries`, in order. A single entry's
/// failure (unreachable git remote, missing manifest, malformed YAML) does
/// not abort the others — it is collected and returned alongside whatever
/// did load, so `orch-infra` can log partial failures at startup without
/// refusing to serve the providers that were fine.
pub async fn load_configured_providers(entries: &[ProviderConfigEntry]) -> (Vec<Provider>, Vec<(String, OrchError)>) {
    let mut providers = Vec::new();
    let mut failures = Vec::new();

    for entry in entries {
        if !entry.enabled {
            continue;
        }

        let loaded = match entry.kind {
            ProviderSourceKind::Filesystem => {
                match &entry.path {
                    Some(path) => loader::load_from_filesystem(path).await,
                    None => Err(OrchError::Validation(format!("provider '{}': filesystem source missing 'path'", entry.name))),
                }
            }
            ProviderSourceKind::Git => {
                match (&entry.repository, &entry.git_ref) {
                    (Some(repository), Some(git_ref)) => loader::load_from_git(repository, git_ref).await,
                    _ => Err(OrchError::Validation(format!("provider '{}': git source missing 'repository' or 'ref'", entry.name))),
                }
            }
        };

        match loaded {
            Ok(provider) => providers.push(provider),
            Err(e) => failures.push((entry.name.clone(), e)),
        }
    }

    (providers, failures)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn loads_enabled_filesystem_entries_and_skips_disabled_ones() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("provider.yaml")).unwrap();
        writeln!(f, "name: core-infra\nresource_types: [postgres]\nworkflow_file: workflows/core.yaml").unwrap();

        let entries = vec![ProviderConfigEntry { name: "core-infra".into(),
                                                  kind: ProviderSourceKind::Filesystem,
                                                  path: Some(dir.path().to_str().unwrap().to_string()),
                                                  repository: None,
                                                  git_ref: None,
                                                  enabled: true },
                            ProviderConfigEntry { name: "disabled-one".into(),
                                                   kind: ProviderSourceKind::Filesystem,
                                                   path: Some("/nonexistent".into()),
                                                   repository: None,
                                                   git_ref: None,
                                                   enabled: false }];

        let (providers, failures) = load_configured_providers(&entries).await;
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "core-infra");
        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn a_failing_entry_does_not_block_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("provider.yaml")).unwrap();
        writeln!(f, "name: good\nresource_types: [postgres]\nworkflow_file: workflows/good.yaml").unwrap();

        let entries = vec![ProviderConfigEntry { name: "broken".into(),
                                                  kind: ProviderSourceKind::Filesystem,
                                                  path: Some("/nonexistent".into()),
                                                  repository: None,
                                                  git_ref: None,
                                                  enabled: true },
                            ProviderConfigEntry { name: "good".into(),
                                                   kind: ProviderSourceKind::Filesystem,
                                                   path: Some(dir.path().to_str().unwrap().to_string()),
                                                   repository: None,
                                                   git_ref: None,
                                                   enabled: true }];

        let (providers, failures) = load_configured_providers(&entries).await;
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "good");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "broken");
    }
}
