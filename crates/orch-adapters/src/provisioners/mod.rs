pub mod argocd_app;
pub mod gitea_repo;
pub mod kubernetes;

pub use argocd_app::ArgoCdAppProvisioner;
pub use gitea_repo::GiteaRepoProvisioner;
pub use kubernetes::KubernetesProvisioner;
