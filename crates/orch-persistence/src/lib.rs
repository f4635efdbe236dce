//! orch-persistence
//!
//! Postgres (Diesel) implementations of `orch-core`'s repository traits
//! (§4.6), plus connection pooling, embedded migrations and `.env` config.
//!
//! Módulos:
//! - `pg`: implementaciones sobre Postgres de `SpecRepository`,
//!   `ResourceRepository` y `WorkflowRepository`.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::init_dotenv;
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgPool, PgResourceRepository,
             PgSpecRepository, PgWorkflowRepository, PoolProvider};
