//! orch-cli: operator-facing command line for the orchestration server.
//!
//! `submit` and `list-specs` talk to the same Postgres database the server
//! uses (`DATABASE_URL`). `demo` wires an in-memory engine end to end —
//! repositories, event bus, a single `kubernetes-deployment` provisioner —
//! and runs one tick, useful for exercising the engine loop without a
//! database or a running HTTP server.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use orch_adapters::provisioners::KubernetesProvisioner;
use orch_core::repository::{ResourceRepository, SpecRepository};
use orch_core::{EventBus, InMemoryResourceRepository, InMemorySpecRepository, InMemoryWorkflowRepository,
                 ProvisionerRegistry, ResourceManager, StepExecutorRegistry, WorkflowExecutor};
use orch_domain::admin_config::EngineConfig;
use orch_domain::{Application, EventFilter, ParsedSpec, ResourceInstance, Spec, ScoreDocument};
use orch_infra::{stream_events, Engine, SseFrame};
use orch_persistence::{build_dev_pool_from_env, PgSpecRepository, PoolProvider};
use orch_providers::ProviderRegistry;
use serde_json::json;

#[derive(Parser)]
#[command(name = "orch-cli", about = "Operator CLI for the orchestration server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submits a Score document to the database, creating an application
    /// under a new (or existing) spec.
    Submit {
        /// Path to a Score YAML document.
        file: String,
        /// Name for the application instance created from this spec.
        #[arg(long)]
        app_name: String,
        /// Owner recorded on the spec and application.
        #[arg(long, default_value = "cli")]
        owner: String,
    },
    /// Lists every spec currently stored.
    ListSpecs,
    /// Runs one engine tick against an in-memory setup, with a single
    /// `kubernetes-deployment` resource already `requested`.
    Demo,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Submit { file, app_name, owner } => submit(&file, &app_name, &owner).await,
        Command::ListSpecs => list_specs().await,
        Command::Demo => demo().await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn submit(file: &str, app_name: &str, owner: &str) -> Result<(), String> {
    let raw = std::fs::read_to_string(file).map_err(|e| format!("reading '{file}': {e}"))?;
    let doc: ScoreDocument = serde_yaml::from_str(&raw).map_err(|e| format!("parsing '{file}': {e}"))?;
    let spec_name = doc.metadata.name.clone();
    let parsed: ParsedSpec = doc.into();

    let pool = build_dev_pool_from_env().map_err(|e| e.to_string())?;
    let repo = PgSpecRepository::new(PoolProvider { pool });

    let spec = match repo.find_spec_by_name(&spec_name).await.map_err(|e| e.to_string())? {
        Some(existing) => existing,
        None => {
            let spec = Spec::new(&spec_name, raw, parsed, owner);
            repo.insert_spec(spec.clone()).await.map_err(|e| e.to_string())?;
            spec
        }
    };

    let app = Application::new(spec.id, app_name, owner);
    repo.insert_application(app.clone()).await.map_err(|e| e.to_string())?;

    println!("spec '{}' ({}), application '{}' ({})", spec.name, spec.id, app.name, app.id);
    Ok(())
}

async fn list_specs() -> Result<(), String> {
    let pool = build_dev_pool_from_env().map_err(|e| e.to_string())?;
    let repo = PgSpecRepository::new(PoolProvider { pool });

    for spec in repo.list_specs().await.map_err(|e| e.to_string())? {
        println!("{}\t{}\tv{}\t{}", spec.id, spec.name, spec.version, spec.owner);
    }
    Ok(())
}

async fn demo() -> Result<(), String> {
    let spec_repo = Arc::new(InMemorySpecRepository::new());
    let resource_repo = Arc::new(InMemoryResourceRepository::new());
    let workflow_repo = Arc::new(InMemoryWorkflowRepository::new());
    let bus = Arc::new(EventBus::with_buffer(64));

    let manager = Arc::new(ResourceManager::new(resource_repo.clone(), bus.clone()));
    let step_registry = Arc::new(StepExecutorRegistry::new());
    let executor = Arc::new(WorkflowExecutor::new(workflow_repo.clone(), bus.clone(), step_registry));

    let mut provisioners = ProvisionerRegistry::new();
    provisioners.register(Arc::new(KubernetesProvisioner));

    let spec = Spec::new("demo-app", "apiVersion: score.dev/v1b1".to_string(), ParsedSpec::default(), "cli-demo");
    spec_repo.insert_spec(spec.clone()).await.map_err(|e| e.to_string())?;
    let app = Application::new(spec.id, "demo-app-instance", "cli-demo");
    spec_repo.insert_application(app.clone()).await.map_err(|e| e.to_string())?;

    let resource = ResourceInstance::new(app.id, "web", "kubernetes-deployment", json!({"replicas": 1}),
                                          "demo-hash".into());
    resource_repo.insert_resource(resource.clone()).await.map_err(|e| e.to_string())?;

    let engine = Engine::new(spec_repo, resource_repo, workflow_repo, manager, executor,
                              Arc::new(ProviderRegistry::new()), Arc::new(provisioners), bus.clone(),
                              EngineConfig::default());

    let mut events = Box::pin(stream_events(bus, EventFilter { app_name: Some(app.name.clone()), types: vec![] }));
    let claimed = engine.tick().await.map_err(|e| e.to_string())?;
    println!("claimed {claimed} resource(s)");

    while let Ok(Some(frame)) = tokio::time::timeout(Duration::from_millis(200), events.next()).await {
        match frame {
            SseFrame::Data(event) => {
                println!("event: {:?} {}", event.event_type, serde_json::to_string(&event.payload).unwrap_or_default())
            }
            SseFrame::Keepalive => println!("event: keepalive"),
        }
    }

    Ok(())
}
