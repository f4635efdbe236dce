//! Capability index, resolver, and atomic reload (§4.2 "Registration" and
//! "Resolution", §5 "Provider registry: readers-writer lock; reload = swap
//! pointer under write lock.").

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use orch_core::{OrchError, OrchResult};
use orch_domain::{Provider, ProviderConflict};
use tokio::sync::RwLock;

/// A resolved snapshot of the capability index. Readers hold a cloned `Arc`
/// so a concurrent reload never blocks or invalidates them mid-resolve.
#[derive(Default, Clone)]
pub struct ProviderIndex {
    providers: HashMap<String, Provider>,
    capability_index: HashMap<String, String>,
}

impl ProviderIndex {
    /// Registers `candidates` in order, enforcing Invariant I4 (a resource
    /// type may be claimed by at most one provider). A provider whose
    /// resource type is already claimed is skipped, not fatal to the whole
    /// reload: its conflict is reported alongside the built index so the
    /// caller can log or surface it.
    fn build(candidates: Vec<Provider>) -> (Self, Vec<ProviderConflict>) {
        let mut index = ProviderIndex::default();
        let mut conflicts = Vec::new();

        for provider in candidates {
            let mut claimed_here = Vec::new();
            let mut conflicting = None;
            for resource_type in &provider.resource_types {
                if let Some(existing_name) = index.capability_index.get(resource_type) {
                    conflicting = Some(ProviderConflict { resource_type: resource_type.clone(),
                                                           incoming_provider: provider.name.clone(),
                                                           existing_provider: existing_name.clone() });
                    break;
                }
                claimed_here.push(resource_type.clone());
            }

            if let Some(conflict) = conflicting {
                conflicts.push(conflict);
                continue;
            }

            for resource_type in claimed_here {
                index.capability_index.insert(resource_type, provider.name.clone());
            }
            index.providers.insert(provider.name.clone(), provider);
        }

        (index, conflicts)
    }

    pub fn resolve(&self, resource_type: &str) -> OrchResult<(Provider, String)> {
        let provider_name = self.capability_index
                                 .get(resource_type)
                                 .ok_or_else(|| OrchError::NotFound(format!("no provider registered for resource type '{resource_type}'")))?;
        let provider = self.providers
                            .get(provider_name)
                            .expect("capability_index entries always point at a registered provider")
                            .clone();
        let workflow_file = provider.workflow_file.clone();
        Ok((provider, workflow_file))
    }

    pub fn providers(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    pub fn resource_types(&self) -> HashSet<String> {
        self.capability_index.keys().cloned().collect()
    }
}

/// The live, swappable provider registry. Resolution reads through a
/// read-locked `Arc` clone; reload rebuilds a fresh index off the lock
/// entirely, then swaps it in under a brief write lock.
pub struct ProviderRegistry {
    index: RwLock<Arc<ProviderIndex>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self { index: RwLock::new(Arc::new(ProviderIndex::default())) }
    }

    pub async fn resolve(&self, resource_type: &str) -> OrchResult<(Provider, String)> {
        self.index.read().await.resolve(resource_type)
    }

    pub async fn snapshot(&self) -> Arc<ProviderIndex> {
        self.index.read().await.clone()
    }

    /// Rebuilds the index from `candidates` and swaps it in. `in_use`
    /// names the resource types that currently have active resources
    /// depending on them (Open Question: provider removal); if the new
    /// index would drop coverage for one of those types, the whole reload
    /// is rejected and the previous index is left in place untouched.
    pub async fn reload(&self, candidates: Vec<Provider>,
                         in_use: &HashSet<String>)
                         -> OrchResult<Vec<ProviderConflict>> {
        let (new_index, conflicts) = ProviderIndex::build(candidates);

        let current = self.index.read().await.clone();
        let current_resource_types = current.resource_types();
        let newly_uncovered: Vec<&String> = current_resource_types.iter()
                                                     .filter(|t| in_use.contains(*t) && !new_index.capability_index.contains_key(*t))
                                                     .collect::<HashSet<_>>()
                                                     .into_iter()
                                                     .collect();
        drop(current);

        if !newly_uncovered.is_empty() {
            let names: Vec<String> = newly_uncovered.into_iter().cloned().collect();
            return Err(OrchError::Conflict(format!("reload would remove provider coverage for resource types still in use: {}",
                                                     names.join(", "))));
        }

        let mut guard = self.index.write().await;
        *guard = Arc::new(new_index);
        Ok(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use orch_domain::ProviderSource;

    use super::*;

    fn provider(name: &str, resource_types: &[&str]) -> Provider {
        Provider { id: uuid::Uuid::new_v4(),
                   name: name.to_string(),
                   resource_types: resource_types.iter().map(|s| s.to_string()).collect(),
                   workflow_file: format!("workflows/{name}.yaml"),
                   source: ProviderSource::Filesystem { path: format!("/providers/{name}") },
                   registered_at: chrono::Utc::now() }
    }

    #[tokio::test]
    async fn resolves_a_registered_resource_type() {
        let registry = ProviderRegistry::new();
        registry.reload(vec![provider("core-infra", &["postgres", "redis"])], &HashSet::new())
                 .await
                 .unwrap();

        let (resolved, workflow) = registry.resolve("postgres").await.unwrap();
        assert_eq!(resolved.name, "core-infra");
        assert_eq!(workflow, "workflows/core-infra.yaml");
    }

    #[tokio::test]
    async fn unresolved_resource_type_is_not_found() {
        let registry = ProviderRegistry::new();
        let err = registry.resolve("postgres").await.unwrap_err();
        assert!(matches!(err, OrchError::NotFound(_)));
    }

    #[tokio::test]
    async fn second_claim_of_a_resource_type_is_reported_as_a_conflict() {
        let registry = ProviderRegistry::new();
        let conflicts = registry.reload(vec![provider("core-infra", &["postgres"]),
                                              provider("imposter", &["postgres"])],
                                         &HashSet::new())
                                 .await
                                 .unwrap();

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].resource_type, "postgres");
        assert_eq!(conflicts[0].existing_provider, "core-infra");
        assert_eq!(conflicts[0].incoming_provider, "imposter");

        let (resolved, _) = registry.resolve("postgres").await.unwrap();
        assert_eq!(resolved.name, "core-infra");
    }

    #[tokio::test]
    async fn reload_refuses_to_drop_coverage_for_in_use_resource_types() {
        let registry = ProviderRegistry::new();
        registry.reload(vec![provider("core-infra", &["postgres"])], &HashSet::new()).await.unwrap();

        let mut in_use = HashSet::new();
        in_use.insert("postgres".to_string());

        let err = registry.reload(vec![provider("unrelated", &["redis"])], &in_use).await.unwrap_err();
        assert!(matches!(err, OrchError::Conflict(_)));

        // previous index must still be intact
        let (resolved, _) = registry.resolve("postgres").await.unwrap();
        assert_eq!(resolved.name, "core-infra");
    }

    #[tokio::test]
    async fn reload_replaces_the_whole_index_when_unconstrained() {
        let registry = ProviderRegistry::new();
        registry.reload(vec![provider("core-infra", &["postgres"])], &HashSet::new()).await.unwrap();
        registry.reload(vec![provider("core-infra-v2", &["postgres"])], &HashSet::new()).await.unwrap();

        let (resolved, _) = registry.resolve("postgres").await.unwrap();
        assert_eq!(resolved.name, "core-infra-v2");
    }
}
