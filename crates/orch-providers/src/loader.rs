//! Provider manifest loading (§4.2 "Loading").
//!
//! Sources are read in the order given by the admin configuration;
//! duplicates by name are allowed to replace an earlier entry, but only on
//! an explicit reload (§4.2 "Loading order is deterministic; duplicates by
//! name replace the earlier entry only on reload.").

use std::path::{Path, PathBuf};

use orch_core::{OrchError, OrchResult};
use orch_domain::{Provider, ProviderManifest, ProviderSource};
use tokio::process::Command;

const MANIFEST_FILENAMES: [&str; 2] = ["provider.yaml", "platform.yaml"];

pub async fn load_from_filesystem(path: &str) -> OrchResult<Provider> {
    let dir = Path::new(path);
    let manifest_path = find_manifest_file(dir).await?;
    let contents = tokio::fs::read_to_string(&manifest_path).await
        .map_err(|e| OrchError::External(format!("reading {}: {e}", manifest_path.display())))?;
    let manifest: ProviderManifest = serde_yaml::from_str(&contents)
        .map_err(|e| OrchError::Validation(format!("parsing {}: {e}", manifest_path.display())))?;
    Ok(Provider::from_manifest(manifest, ProviderSource::Filesystem { path: path.to_string() }))
}

async fn find_manifest_file(dir: &Path) -> OrchResult<PathBuf> {
    for name in MANIFEST_FILENAMES {
        let candidate = dir.join(name);
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Ok(candidate);
        }
    }
    Err(OrchError::NotFound(format!("no provider.yaml or platform.yaml under {}", dir.display())))
}

/// Shallow-clones `repository` at `git_ref` into a scratch directory and
/// loads its manifest the same way as a filesystem source.
pub async fn load_from_git(repository: &str, git_ref: &str) -> OrchResult<Provider> {
    let scratch = std::env::temp_dir().join(format!("orch-provider-{}", uuid::Uuid::new_v4()));
    let status = Command::new("git").args(["clone", "--depth", "1", "--branch", git_ref, repository])
                                     .arg(&scratch)
                                     .status()
                                     .await
                                     .map_err(|e| OrchError::External(format!("spawning git: {e}")))?;
    if !status.success() {
        return Err(OrchError::External(format!("git clone of {repository}@{git_ref} failed")));
    }

    let manifest_path = find_manifest_file(&scratch).await?;
    let contents = tokio::fs::read_to_string(&manifest_path).await
        .map_err(|e| OrchError::External(format!("reading {}: {e}", manifest_path.display())))?;
    let manifest: ProviderManifest = serde_yaml::from_str(&contents)
        .map_err(|e| OrchError::Validation(format!("parsing {}: {e}", manifest_path.display())))?;

    let _ = tokio::fs::remove_dir_all(&scratch).await;
    Ok(Provider::from_manifest(manifest,
                                ProviderSource::Git { repository: repository.to_string(),
                                                       git_ref: git_ref.to_string() }))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn loads_provider_yaml_from_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("provider.yaml")).unwrap();
        writeln!(f, "name: core-infra\nresource_types: [postgres, redis]\nworkflow_file: workflows/core.yaml").unwrap();

        let provider = load_from_filesystem(dir.path().to_str().unwrap()).await.unwrap();
        assert_eq!(provider.name, "core-infra");
        assert_eq!(provider.resource_types, vec!["postgres", "redis"]);
    }

    #[tokio::test]
    async fn falls_back_to_legacy_platform_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("platform.yaml")).unwrap();
        writeln!(f, "name: legacy\nresource_types: [volume]\nworkflow_file: workflows/legacy.yaml").unwrap();

        let provider = load_from_filesystem(dir.path().to_str().unwrap()).await.unwrap();
        assert_eq!(provider.name, "legacy");
    }

    #[tokio::test]
    async fn missing_manifest_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_filesystem(dir.path().to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, OrchError::NotFound(_)));
    }
}
