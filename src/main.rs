//! Orchestration server entry point (§6). Loads the admin and golden-paths
//! configuration, opens the database pool (running migrations on first
//! checkout), wires the kernel (`orch-core`) to its concrete adapters
//! (`orch-adapters`) and Postgres repositories (`orch-persistence`), starts
//! the engine's poll loop (`orch-infra::Engine`) alongside the HTTP server,
//! and shuts both down together on SIGINT/SIGTERM.
//!
//! Exit codes: 0 on normal shutdown; non-zero if the database is
//! unreachable or migrations fail at startup (§6).

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use orch_adapters::provisioners::{ArgoCdAppProvisioner, GiteaRepoProvisioner, KubernetesProvisioner};
use orch_adapters::steps::{AnsibleExecutor, GitExecutor, HttpExecutor, KubernetesExecutor, ScriptExecutor,
                            TerraformExecutor};
use orch_adapters::UrlAllowList;
use orch_core::{EventBus, ProvisionerRegistry, ResourceManager, StepExecutorRegistry, WorkflowExecutor};
use orch_domain::admin_config::AdminConfig;
use orch_domain::GoldenPathsConfig;
use orch_infra::Engine;
use orch_persistence::config::DbConfig;
use orch_persistence::{build_pool, PgResourceRepository, PgSpecRepository, PgWorkflowRepository, PoolProvider};
use orch_providers::{load_configured_providers, ProviderRegistry};
use orchestrator_server::state::AppState;
use tokio::sync::RwLock;

#[derive(Parser)]
#[command(name = "orchestrator-server", about = "Score-spec platform orchestration server")]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    #[arg(long, default_value = "admin-config.yaml")]
    admin_config: String,

    #[arg(long, default_value = "goldenpaths.yaml")]
    golden_paths: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            log::error!("fatal startup error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<(), String> {
    let admin_config_raw = std::fs::read_to_string(&args.admin_config)
        .map_err(|e| format!("reading '{}': {e}", args.admin_config))?;
    let admin_config =
        AdminConfig::from_yaml_str(&admin_config_raw).map_err(|e| format!("parsing admin config: {e}"))?;

    let golden_paths = match std::fs::read_to_string(&args.golden_paths) {
        Ok(raw) => GoldenPathsConfig::from_yaml_str(&raw).map_err(|e| format!("parsing golden paths: {e}"))?
                                                          .into_golden_paths(),
        Err(_) => {
            log::warn!("no golden paths file at '{}', starting with none", args.golden_paths);
            Vec::new()
        }
    };

    let db_config = DbConfig::from_env();
    let pool = build_pool(&db_config.url, db_config.min_connections, db_config.max_connections)
        .map_err(|e| format!("database unavailable: {e}"))?;

    let spec_repo = Arc::new(PgSpecRepository::new(PoolProvider { pool: pool.clone() }));
    let resource_repo = Arc::new(PgResourceRepository::new(PoolProvider { pool: pool.clone() }));
    let workflow_repo = Arc::new(PgWorkflowRepository::new(PoolProvider { pool }));

    let bus = Arc::new(EventBus::new());
    let resource_manager = Arc::new(ResourceManager::new(resource_repo.clone(), bus.clone()));

    let allow_list = Arc::new(build_allow_list(&admin_config));
    let http_client = reqwest::Client::new();

    let mut step_registry = StepExecutorRegistry::new();
    step_registry.register(Arc::new(TerraformExecutor));
    step_registry.register(Arc::new(KubernetesExecutor));
    step_registry.register(Arc::new(AnsibleExecutor));
    step_registry.register(Arc::new(ScriptExecutor));
    step_registry.register(Arc::new(GitExecutor::new(allow_list.clone())));
    step_registry.register(Arc::new(HttpExecutor::new(http_client.clone(), allow_list.clone())));
    let workflow_executor =
        Arc::new(WorkflowExecutor::new(workflow_repo.clone(), bus.clone(), Arc::new(step_registry)));

    let mut provisioner_registry = ProvisionerRegistry::new();
    provisioner_registry.register(Arc::new(KubernetesProvisioner));
    if let Some(gitea) = &admin_config.integrations.gitea {
        provisioner_registry.register(Arc::new(GiteaRepoProvisioner::new(http_client.clone(), allow_list.clone(),
                                                                          gitea.url.clone(), gitea.org.clone(),
                                                                          gitea.username.clone(),
                                                                          gitea.password.clone())));
    }
    if let Some(argocd) = &admin_config.integrations.argocd {
        provisioner_registry.register(Arc::new(ArgoCdAppProvisioner::new(http_client.clone(), allow_list.clone(),
                                                                          argocd.url.clone(), argocd.username.clone(),
                                                                          argocd.password.clone())));
    }
    let provisioner_registry = Arc::new(provisioner_registry);

    let provider_registry = Arc::new(ProviderRegistry::new());
    let (initial_providers, failures) = load_configured_providers(&admin_config.providers).await;
    for (name, e) in &failures {
        log::warn!("provider '{name}' failed to load at startup: {e}");
    }
    if let Err(e) = provider_registry.reload(initial_providers, &Default::default()).await {
        log::warn!("initial provider registration reported conflicts: {e}");
    }

    let engine_config = admin_config.engine.clone();
    let state = AppState { spec_repo: spec_repo.clone(),
                            resource_repo: resource_repo.clone(),
                            workflow_repo: workflow_repo.clone(),
                            resource_manager: resource_manager.clone(),
                            workflow_executor: workflow_executor.clone(),
                            provider_registry: provider_registry.clone(),
                            provisioner_registry: provisioner_registry.clone(),
                            bus: bus.clone(),
                            golden_paths: Arc::new(RwLock::new(golden_paths)),
                            admin_config: Arc::new(RwLock::new(admin_config)) };

    let engine = Engine::new(spec_repo, resource_repo, workflow_repo, resource_manager, workflow_executor,
                              provider_registry, provisioner_registry, bus, engine_config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_task = tokio::spawn(engine.run(shutdown_rx));

    let app = orchestrator_server::http::router(state);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse().map_err(|e| format!("bad address: {e}"))?;
    log::info!("orchestration server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| format!("bind {addr}: {e}"))?;

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal())
                               .await
                               .map_err(|e| format!("server error: {e}"))?;

    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    Ok(())
}

fn build_allow_list(config: &AdminConfig) -> UrlAllowList {
    let mut hosts = Vec::new();
    for url in [config.integrations.gitea.as_ref().map(|g| &g.url), config.integrations.argocd.as_ref().map(|a| &a.url)]
        .into_iter()
        .flatten()
    {
        if let Ok(parsed) = url::Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                hosts.push(host.to_string());
            }
        }
    }
    if let Ok(extra) = std::env::var("ORCH_ALLOWED_HOSTS") {
        hosts.extend(extra.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
    }
    UrlAllowList::new(hosts)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler")
                                                                                  .recv()
                                                                                  .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    log::info!("shutdown signal received");
}
