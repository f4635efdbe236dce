//! Postgres (Diesel) implementations of the `orch-core` repository traits
//! (C1, §4.6).
//!
//! Diesel is synchronous; every public async method wraps its query in
//! `tokio::task::spawn_blocking` so it plays nicely inside the Tokio
//! executor the rest of the workspace runs on. State+audit-row writes
//! (`apply_transition`) and step state+log writes (`update_step`) commit in
//! a single Diesel transaction, matching §4.6's "commit together" rule.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::warn;
use orch_core::errors::{OrchError, OrchResult};
use orch_core::repository::{ResourceRepository, SpecRepository, WorkflowRepository};
use orch_domain::{Application, HealthStatus, Hint, ParsedSpec, ResourceHealthCheck, ResourceInstance, ResourceKind,
                   ResourceState, ResourceStateTransition, Spec, StepExecution, StepStatus, WorkflowExecution,
                   WorkflowStatus};
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{applications, resource_health_checks, resource_instances, resource_state_transitions, specs,
                     step_executions, workflow_executions};

pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool.get().map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict | PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected") || m.contains("could not serialize access due to concurrent update")
            || m.contains("connection closed") || m.contains("connection refused") || m.contains("timeout")
        }
        _ => false,
    }
}

fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * (attempts + 1);
                warn!("retryable persistence error (attempt {}): {e:?} -> sleeping {delay_ms}ms", attempts + 1);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let min = min_size.max(1).min(max_size.max(1));
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(min))
                                    .max_size(max_size.max(1))
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get().map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env();
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

async fn blocking<F, T>(f: F) -> OrchResult<T>
    where F: FnOnce() -> Result<T, PersistenceError> + Send + 'static,
          T: Send + 'static
{
    tokio::task::spawn_blocking(f).await
                                   .map_err(|e| OrchError::Internal(format!("blocking task panicked: {e}")))?
                                   .map_err(OrchError::from)
}

// --- row <-> domain mapping -------------------------------------------------

#[derive(Queryable, Insertable)]
#[diesel(table_name = specs)]
struct SpecRow {
    id: Uuid,
    name: String,
    version: i32,
    raw_document: String,
    parsed: Value,
    owner: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Spec> for SpecRow {
    fn from(s: Spec) -> Self {
        Self { id: s.id,
               name: s.name,
               version: s.version,
               raw_document: s.raw_document,
               parsed: serde_json::to_value(&s.parsed).unwrap_or(Value::Null),
               owner: s.owner,
               created_at: s.created_at,
               updated_at: s.updated_at }
    }
}

impl TryFrom<SpecRow> for Spec {
    type Error = PersistenceError;

    fn try_from(r: SpecRow) -> Result<Self, Self::Error> {
        let parsed: ParsedSpec = serde_json::from_value(r.parsed)
            .map_err(|e| PersistenceError::Unknown(format!("deserializing spec.parsed: {e}")))?;
        Ok(Spec { id: r.id,
                  name: r.name,
                  version: r.version,
                  raw_document: r.raw_document,
                  parsed,
                  owner: r.owner,
                  created_at: r.created_at,
                  updated_at: r.updated_at })
    }
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = applications)]
struct ApplicationRow {
    id: Uuid,
    spec_id: Uuid,
    name: String,
    owner: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Application> for ApplicationRow {
    fn from(a: Application) -> Self {
        Self { id: a.id, spec_id: a.spec_id, name: a.name, owner: a.owner, created_at: a.created_at,
               updated_at: a.updated_at }
    }
}

impl From<ApplicationRow> for Application {
    fn from(r: ApplicationRow) -> Self {
        Application { id: r.id, spec_id: r.spec_id, name: r.name, owner: r.owner, created_at: r.created_at,
                      updated_at: r.updated_at }
    }
}

#[derive(Queryable, Insertable, AsChangeset)]
#[diesel(table_name = resource_instances)]
struct ResourceRow {
    id: Uuid,
    application_id: Uuid,
    name: String,
    resource_type: String,
    state: String,
    health_status: String,
    kind: String,
    configuration: Value,
    configuration_hash: String,
    provider_metadata: Value,
    error_message: Option<String>,
    hints: Value,
    external_state: Option<Value>,
    provider_id: Option<Uuid>,
    reference_url: Option<String>,
    workflow_execution_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ResourceInstance> for ResourceRow {
    fn from(r: ResourceInstance) -> Self {
        Self { id: r.id,
               application_id: r.application_id,
               name: r.name,
               resource_type: r.resource_type,
               state: r.state.as_str().to_string(),
               health_status: health_status_str(r.health_status).to_string(),
               kind: resource_kind_str(r.kind).to_string(),
               configuration: r.configuration,
               configuration_hash: r.configuration_hash,
               provider_metadata: r.provider_metadata,
               error_message: r.error_message,
               hints: serde_json::to_value(&r.hints).unwrap_or(Value::Array(vec![])),
               external_state: r.external_state,
               provider_id: r.provider_id,
               reference_url: r.reference_url,
               workflow_execution_id: r.workflow_execution_id,
               created_at: r.created_at,
               updated_at: r.updated_at }
    }
}

impl TryFrom<ResourceRow> for ResourceInstance {
    type Error = PersistenceError;

    fn try_from(r: ResourceRow) -> Result<Self, Self::Error> {
        let hints: Vec<Hint> = serde_json::from_value(r.hints).unwrap_or_default();
        Ok(ResourceInstance { id: r.id,
                               application_id: r.application_id,
                               name: r.name,
                               resource_type: r.resource_type,
                               state: parse_state(&r.state)?,
                               health_status: parse_health(&r.health_status)?,
                               kind: parse_kind(&r.kind)?,
                               configuration: r.configuration,
                               configuration_hash: r.configuration_hash,
                               provider_metadata: r.provider_metadata,
                               error_message: r.error_message,
                               hints,
                               external_state: r.external_state,
                               provider_id: r.provider_id,
                               reference_url: r.reference_url,
                               workflow_execution_id: r.workflow_execution_id,
                               created_at: r.created_at,
                               updated_at: r.updated_at })
    }
}

fn health_status_str(h: HealthStatus) -> &'static str {
    match h {
        HealthStatus::Unknown => "unknown",
        HealthStatus::Healthy => "healthy",
        HealthStatus::Degraded => "degraded",
        HealthStatus::Unhealthy => "unhealthy",
    }
}

fn parse_health(s: &str) -> Result<HealthStatus, PersistenceError> {
    match s {
        "unknown" => Ok(HealthStatus::Unknown),
        "healthy" => Ok(HealthStatus::Healthy),
        "degraded" => Ok(HealthStatus::Degraded),
        "unhealthy" => Ok(HealthStatus::Unhealthy),
        other => Err(PersistenceError::Unknown(format!("unrecognized health_status '{other}'"))),
    }
}

fn resource_kind_str(k: ResourceKind) -> &'static str {
    match k {
        ResourceKind::Native => "native",
        ResourceKind::Delegated => "delegated",
        ResourceKind::External => "external",
    }
}

fn parse_kind(s: &str) -> Result<ResourceKind, PersistenceError> {
    match s {
        "native" => Ok(ResourceKind::Native),
        "delegated" => Ok(ResourceKind::Delegated),
        "external" => Ok(ResourceKind::External),
        other => Err(PersistenceError::Unknown(format!("unrecognized resource kind '{other}'"))),
    }
}

fn parse_state(s: &str) -> Result<ResourceState, PersistenceError> {
    match s {
        "requested" => Ok(ResourceState::Requested),
        "provisioning" => Ok(ResourceState::Provisioning),
        "active" => Ok(ResourceState::Active),
        "scaling" => Ok(ResourceState::Scaling),
        "updating" => Ok(ResourceState::Updating),
        "degraded" => Ok(ResourceState::Degraded),
        "terminating" => Ok(ResourceState::Terminating),
        "terminated" => Ok(ResourceState::Terminated),
        "failed" => Ok(ResourceState::Failed),
        other => Err(PersistenceError::Unknown(format!("unrecognized resource state '{other}'"))),
    }
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = resource_state_transitions)]
struct TransitionRow {
    id: Uuid,
    resource_id: Uuid,
    from_state: Option<String>,
    to_state: String,
    reason: String,
    triggered_by: String,
    metadata: Value,
    occurred_at: DateTime<Utc>,
}

impl From<ResourceStateTransition> for TransitionRow {
    fn from(t: ResourceStateTransition) -> Self {
        Self { id: t.id,
               resource_id: t.resource_id,
               from_state: t.from_state.map(|s| s.as_str().to_string()),
               to_state: t.to_state.as_str().to_string(),
               reason: t.reason,
               triggered_by: t.triggered_by,
               metadata: t.metadata,
               occurred_at: t.occurred_at }
    }
}

impl TryFrom<TransitionRow> for ResourceStateTransition {
    type Error = PersistenceError;

    fn try_from(r: TransitionRow) -> Result<Self, Self::Error> {
        Ok(ResourceStateTransition { id: r.id,
                                      resource_id: r.resource_id,
                                      from_state: r.from_state.map(|s| parse_state(&s)).transpose()?,
                                      to_state: parse_state(&r.to_state)?,
                                      reason: r.reason,
                                      triggered_by: r.triggered_by,
                                      metadata: r.metadata,
                                      occurred_at: r.occurred_at })
    }
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = resource_health_checks)]
struct HealthCheckRow {
    id: Uuid,
    resource_id: Uuid,
    status: String,
    message: Option<String>,
    checked_at: DateTime<Utc>,
}

impl From<ResourceHealthCheck> for HealthCheckRow {
    fn from(c: ResourceHealthCheck) -> Self {
        Self { id: c.id,
               resource_id: c.resource_id,
               status: health_status_str(c.status).to_string(),
               message: c.message,
               checked_at: c.checked_at }
    }
}

#[derive(Queryable, Insertable, AsChangeset)]
#[diesel(table_name = workflow_executions)]
struct WorkflowExecutionRow {
    id: Uuid,
    workflow_name: String,
    application_name: String,
    parent_resource_id: Option<Uuid>,
    status: String,
    inputs: Value,
    outputs: Value,
    total_steps: i32,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

fn workflow_status_str(s: WorkflowStatus) -> &'static str {
    match s {
        WorkflowStatus::Pending => "pending",
        WorkflowStatus::Running => "running",
        WorkflowStatus::Completed => "completed",
        WorkflowStatus::Failed => "failed",
        WorkflowStatus::Cancelled => "cancelled",
    }
}

fn parse_workflow_status(s: &str) -> Result<WorkflowStatus, PersistenceError> {
    match s {
        "pending" => Ok(WorkflowStatus::Pending),
        "running" => Ok(WorkflowStatus::Running),
        "completed" => Ok(WorkflowStatus::Completed),
        "failed" => Ok(WorkflowStatus::Failed),
        "cancelled" => Ok(WorkflowStatus::Cancelled),
        other => Err(PersistenceError::Unknown(format!("unrecognized workflow status '{other}'"))),
    }
}

impl From<WorkflowExecution> for WorkflowExecutionRow {
    fn from(w: WorkflowExecution) -> Self {
        Self { id: w.id,
               workflow_name: w.workflow_name,
               application_name: w.application_name,
               parent_resource_id: w.parent_resource_id,
               status: workflow_status_str(w.status).to_string(),
               inputs: serde_json::to_value(&w.inputs).unwrap_or(Value::Object(Default::default())),
               outputs: serde_json::to_value(&w.outputs).unwrap_or(Value::Object(Default::default())),
               total_steps: w.total_steps as i32,
               error_message: w.error_message,
               started_at: w.started_at,
               completed_at: w.completed_at }
    }
}

impl TryFrom<WorkflowExecutionRow> for WorkflowExecution {
    type Error = PersistenceError;

    fn try_from(r: WorkflowExecutionRow) -> Result<Self, Self::Error> {
        let inputs: HashMap<String, Value> = serde_json::from_value(r.inputs).unwrap_or_default();
        let outputs: HashMap<String, Value> = serde_json::from_value(r.outputs).unwrap_or_default();
        Ok(WorkflowExecution { id: r.id,
                                workflow_name: r.workflow_name,
                                application_name: r.application_name,
                                parent_resource_id: r.parent_resource_id,
                                status: parse_workflow_status(&r.status)?,
                                inputs,
                                outputs,
                                total_steps: r.total_steps as usize,
                                error_message: r.error_message,
                                started_at: r.started_at,
                                completed_at: r.completed_at })
    }
}

#[derive(Queryable, Insertable, AsChangeset)]
#[diesel(table_name = step_executions)]
struct StepExecutionRow {
    id: Uuid,
    workflow_execution_id: Uuid,
    ordinal: i32,
    name: String,
    step_type: String,
    status: String,
    config: Value,
    attempts: i32,
    max_attempts: i32,
    timeout_seconds: i64,
    output: Option<Value>,
    error_message: Option<String>,
    logs: Value,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

fn step_status_str(s: StepStatus) -> &'static str {
    match s {
        StepStatus::Pending => "pending",
        StepStatus::Running => "running",
        StepStatus::Completed => "completed",
        StepStatus::Failed => "failed",
        StepStatus::Skipped => "skipped",
        StepStatus::Cancelled => "cancelled",
    }
}

fn parse_step_status(s: &str) -> Result<StepStatus, PersistenceError> {
    match s {
        "pending" => Ok(StepStatus::Pending),
        "running" => Ok(StepStatus::Running),
        "completed" => Ok(StepStatus::Completed),
        "failed" => Ok(StepStatus::Failed),
        "skipped" => Ok(StepStatus::Skipped),
        "cancelled" => Ok(StepStatus::Cancelled),
        other => Err(PersistenceError::Unknown(format!("unrecognized step status '{other}'"))),
    }
}

impl From<StepExecution> for StepExecutionRow {
    fn from(s: StepExecution) -> Self {
        Self { id: s.id,
               workflow_execution_id: s.workflow_execution_id,
               ordinal: s.ordinal as i32,
               name: s.name,
               step_type: s.step_type,
               status: step_status_str(s.status).to_string(),
               config: s.config,
               attempts: s.attempts as i32,
               max_attempts: s.max_attempts as i32,
               timeout_seconds: s.timeout_seconds as i64,
               output: s.output,
               error_message: s.error_message,
               logs: serde_json::to_value(&s.logs).unwrap_or(Value::Array(vec![])),
               started_at: s.started_at,
               completed_at: s.completed_at }
    }
}

impl TryFrom<StepExecutionRow> for StepExecution {
    type Error = PersistenceError;

    fn try_from(r: StepExecutionRow) -> Result<Self, Self::Error> {
        let logs: Vec<String> = serde_json::from_value(r.logs).unwrap_or_default();
        Ok(StepExecution { id: r.id,
                            workflow_execution_id: r.workflow_execution_id,
                            ordinal: r.ordinal as usize,
                            name: r.name,
                            step_type: r.step_type,
                            status: parse_step_status(&r.status)?,
                            config: r.config,
                            attempts: r.attempts as u32,
                            max_attempts: r.max_attempts as u32,
                            timeout_seconds: r.timeout_seconds as u64,
                            output: r.output,
                            error_message: r.error_message,
                            logs,
                            started_at: r.started_at,
                            completed_at: r.completed_at })
    }
}

// --- repositories ------------------------------------------------------

pub struct PgSpecRepository<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgSpecRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: ConnectionProvider + 'static> SpecRepository for PgSpecRepository<P> {
    async fn insert_spec(&self, spec: Spec) -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            with_retry(|| {
                diesel::insert_into(specs::table).values(&SpecRow::from(spec.clone())).execute(&mut conn)?;
                Ok(())
            })
        }).await
    }

    async fn get_spec(&self, id: Uuid) -> OrchResult<Spec> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let row: SpecRow =
                with_retry(|| specs::table.find(id).first(&mut conn).map_err(PersistenceError::from))?;
            row.try_into()
        }).await
    }

    async fn find_spec_by_name(&self, name: &str) -> OrchResult<Option<Spec>> {
        let provider = self.provider.connection()?;
        let name = name.to_string();
        blocking(move || {
            let mut conn = provider;
            let row: Option<SpecRow> = with_retry(|| {
                specs::table.filter(specs::name.eq(&name))
                            .order(specs::version.desc())
                            .first(&mut conn)
                            .optional()
                            .map_err(PersistenceError::from)
            })?;
            row.map(TryInto::try_into).transpose()
        }).await
    }

    async fn list_specs(&self) -> OrchResult<Vec<Spec>> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let rows: Vec<SpecRow> = with_retry(|| specs::table.load(&mut conn).map_err(PersistenceError::from))?;
            rows.into_iter().map(TryInto::try_into).collect()
        }).await
    }

    async fn insert_application(&self, app: Application) -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            with_retry(|| {
                diesel::insert_into(applications::table).values(&ApplicationRow::from(app.clone())).execute(&mut conn)?;
                Ok(())
            })
        }).await
    }

    async fn get_application(&self, id: Uuid) -> OrchResult<Application> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let row: ApplicationRow =
                with_retry(|| applications::table.find(id).first(&mut conn).map_err(PersistenceError::from))?;
            Ok(row.into())
        }).await
    }

    async fn find_application_by_name(&self, name: &str) -> OrchResult<Option<Application>> {
        let provider = self.provider.connection()?;
        let name = name.to_string();
        blocking(move || {
            let mut conn = provider;
            let row: Option<ApplicationRow> = with_retry(|| {
                applications::table.filter(applications::name.eq(&name))
                                   .first(&mut conn)
                                   .optional()
                                   .map_err(PersistenceError::from)
            })?;
            Ok(row.map(Into::into))
        }).await
    }

    async fn list_applications(&self) -> OrchResult<Vec<Application>> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let rows: Vec<ApplicationRow> =
                with_retry(|| applications::table.load(&mut conn).map_err(PersistenceError::from))?;
            Ok(rows.into_iter().map(Into::into).collect())
        }).await
    }

    async fn delete_application(&self, id: Uuid) -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            with_retry(|| {
                diesel::delete(applications::table.find(id)).execute(&mut conn)?;
                Ok(())
            })
        }).await
    }
}

pub struct PgResourceRepository<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgResourceRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: ConnectionProvider + 'static> ResourceRepository for PgResourceRepository<P> {
    async fn insert_resource(&self, resource: ResourceInstance) -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let row = ResourceRow::from(resource);
            with_retry(|| {
                diesel::insert_into(resource_instances::table).values(&row)
                                                               .on_conflict(resource_instances::id)
                                                               .do_update()
                                                               .set(&row)
                                                               .execute(&mut conn)?;
                Ok(())
            })
        }).await
    }

    async fn get_resource(&self, id: Uuid) -> OrchResult<ResourceInstance> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let row: ResourceRow =
                with_retry(|| resource_instances::table.find(id).first(&mut conn).map_err(PersistenceError::from))?;
            row.try_into()
        }).await
    }

    async fn find_resource_by_app_and_name(&self, application_id: Uuid, name: &str)
                                            -> OrchResult<Option<ResourceInstance>> {
        let provider = self.provider.connection()?;
        let name = name.to_string();
        blocking(move || {
            let mut conn = provider;
            let row: Option<ResourceRow> = with_retry(|| {
                resource_instances::table.filter(resource_instances::application_id.eq(application_id))
                                         .filter(resource_instances::name.eq(&name))
                                         .first(&mut conn)
                                         .optional()
                                         .map_err(PersistenceError::from)
            })?;
            row.map(TryInto::try_into).transpose()
        }).await
    }

    async fn list_resources_by_application(&self, application_id: Uuid) -> OrchResult<Vec<ResourceInstance>> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let rows: Vec<ResourceRow> = with_retry(|| {
                resource_instances::table.filter(resource_instances::application_id.eq(application_id))
                                         .load(&mut conn)
                                         .map_err(PersistenceError::from)
            })?;
            rows.into_iter().map(TryInto::try_into).collect()
        }).await
    }

    async fn list_resources(&self) -> OrchResult<Vec<ResourceInstance>> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let rows: Vec<ResourceRow> =
                with_retry(|| resource_instances::table.load(&mut conn).map_err(PersistenceError::from))?;
            rows.into_iter().map(TryInto::try_into).collect()
        }).await
    }

    async fn apply_transition(&self, resource: ResourceInstance, transition: ResourceStateTransition)
                               -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let resource_row = ResourceRow::from(resource);
            let transition_row = TransitionRow::from(transition);
            with_retry(|| {
                conn.build_transaction().read_write().run(|tx| {
                    diesel::insert_into(resource_instances::table).values(&resource_row)
                                                                   .on_conflict(resource_instances::id)
                                                                   .do_update()
                                                                   .set(&resource_row)
                                                                   .execute(tx)?;
                    diesel::insert_into(resource_state_transitions::table).values(&transition_row).execute(tx)?;
                    Ok::<(), diesel::result::Error>(())
                }).map_err(PersistenceError::from)
            })
        }).await
    }

    async fn list_transitions(&self, resource_id: Uuid) -> OrchResult<Vec<ResourceStateTransition>> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let rows: Vec<TransitionRow> = with_retry(|| {
                resource_state_transitions::table.filter(resource_state_transitions::resource_id.eq(resource_id))
                                                  .order(resource_state_transitions::occurred_at.asc())
                                                  .load(&mut conn)
                                                  .map_err(PersistenceError::from)
            })?;
            rows.into_iter().map(TryInto::try_into).collect()
        }).await
    }

    async fn record_health_check(&self, resource: ResourceInstance, check: ResourceHealthCheck) -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let resource_row = ResourceRow::from(resource);
            let check_row = HealthCheckRow::from(check);
            with_retry(|| {
                conn.build_transaction().read_write().run(|tx| {
                    diesel::insert_into(resource_instances::table).values(&resource_row)
                                                                   .on_conflict(resource_instances::id)
                                                                   .do_update()
                                                                   .set(&resource_row)
                                                                   .execute(tx)?;
                    diesel::insert_into(resource_health_checks::table).values(&check_row).execute(tx)?;
                    Ok::<(), diesel::result::Error>(())
                }).map_err(PersistenceError::from)
            })
        }).await
    }

    async fn claim_requested_resources(&self, limit: usize) -> OrchResult<Vec<ResourceInstance>> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            // `FOR UPDATE SKIP LOCKED` so concurrent engine ticks never lock the
            // same resource twice (§4.4). Backed by `resource_instances_state_idx`.
            // The lock alone isn't the guarantee: it's only held until this
            // transaction commits, so each locked row is also stamped with a
            // claim marker (`workflow_execution_id`) in the same transaction —
            // by the time a second tick's `SKIP LOCKED` select runs, these rows
            // no longer match `workflow_execution_id IS NULL` and can't be
            // re-claimed, even across separate processes.
            let rows: Vec<ResourceRow> = with_retry(|| {
                conn.build_transaction().read_write().run(|tx| {
                    let candidates: Vec<ResourceRow> =
                        resource_instances::table.filter(resource_instances::state.eq("requested"))
                                                 .filter(resource_instances::workflow_execution_id.is_null())
                                                 .order(resource_instances::created_at.asc())
                                                 .limit(limit as i64)
                                                 .for_update()
                                                 .skip_locked()
                                                 .load(tx)?;

                    let mut claimed = Vec::with_capacity(candidates.len());
                    for mut row in candidates {
                        let marker = Uuid::new_v4();
                        let now = Utc::now();
                        diesel::update(resource_instances::table.find(row.id))
                            .set((resource_instances::workflow_execution_id.eq(marker),
                                  resource_instances::updated_at.eq(now)))
                            .execute(tx)?;
                        row.workflow_execution_id = Some(marker);
                        row.updated_at = now;
                        claimed.push(row);
                    }
                    Ok::<Vec<ResourceRow>, diesel::result::Error>(claimed)
                }).map_err(PersistenceError::from)
            })?;
            rows.into_iter().map(TryInto::try_into).collect()
        }).await
    }
}

pub struct PgWorkflowRepository<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgWorkflowRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: ConnectionProvider + 'static> WorkflowRepository for PgWorkflowRepository<P> {
    async fn insert_execution(&self, execution: WorkflowExecution) -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let row = WorkflowExecutionRow::from(execution);
            with_retry(|| {
                diesel::insert_into(workflow_executions::table).values(&row).execute(&mut conn)?;
                Ok(())
            })
        }).await
    }

    async fn update_execution(&self, execution: WorkflowExecution) -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let row = WorkflowExecutionRow::from(execution);
            with_retry(|| {
                diesel::insert_into(workflow_executions::table).values(&row)
                                                                .on_conflict(workflow_executions::id)
                                                                .do_update()
                                                                .set(&row)
                                                                .execute(&mut conn)?;
                Ok(())
            })
        }).await
    }

    async fn get_execution(&self, id: Uuid) -> OrchResult<WorkflowExecution> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let row: WorkflowExecutionRow =
                with_retry(|| workflow_executions::table.find(id).first(&mut conn).map_err(PersistenceError::from))?;
            row.try_into()
        }).await
    }

    async fn list_executions(&self) -> OrchResult<Vec<WorkflowExecution>> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let rows: Vec<WorkflowExecutionRow> =
                with_retry(|| workflow_executions::table.load(&mut conn).map_err(PersistenceError::from))?;
            rows.into_iter().map(TryInto::try_into).collect()
        }).await
    }

    async fn insert_step(&self, step: StepExecution) -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let row = StepExecutionRow::from(step);
            with_retry(|| {
                diesel::insert_into(step_executions::table).values(&row).execute(&mut conn)?;
                Ok(())
            })
        }).await
    }

    async fn update_step(&self, step: StepExecution) -> OrchResult<()> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let row = StepExecutionRow::from(step);
            with_retry(|| {
                conn.build_transaction().read_write().run(|tx| {
                    diesel::insert_into(step_executions::table).values(&row)
                                                                .on_conflict(step_executions::id)
                                                                .do_update()
                                                                .set(&row)
                                                                .execute(tx)?;
                    Ok::<(), diesel::result::Error>(())
                }).map_err(PersistenceError::from)
            })
        }).await
    }

    async fn list_steps(&self, workflow_execution_id: Uuid) -> OrchResult<Vec<StepExecution>> {
        let provider = self.provider.connection()?;
        blocking(move || {
            let mut conn = provider;
            let rows: Vec<StepExecutionRow> = with_retry(|| {
                step_executions::table.filter(step_executions::workflow_execution_id.eq(workflow_execution_id))
                                      .order(step_executions::ordinal.asc())
                                      .load(&mut conn)
                                      .map_err(PersistenceError::from)
            })?;
            rows.into_iter().map(TryInto::try_into).collect()
        }).await
    }
}
