pub mod ansible;
pub mod git;
pub mod http;
pub mod kubernetes;
pub mod script;
pub mod terraform;

pub use ansible::AnsibleExecutor;
pub use git::GitExecutor;
pub use http::HttpExecutor;
pub use kubernetes::KubernetesExecutor;
pub use script::ScriptExecutor;
pub use terraform::TerraformExecutor;
