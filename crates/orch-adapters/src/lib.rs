//! orch-adapters: step executors and provisioners (§4.5, SPEC_FULL §A "C5"
//! adjacent collaborators).
//!
//! Everything here talks to the outside world — shelling out to CLIs
//! (`terraform`, `kubectl`, `ansible-playbook`, `git`) or calling HTTP APIs
//! (`gitea-repo`, `argocd-app`, the generic `http` step). All outbound URLs
//! route through `allowlist::UrlAllowList` first.

pub mod allowlist;
pub mod process;
pub mod provisioners;
pub mod steps;

pub use allowlist::UrlAllowList;
