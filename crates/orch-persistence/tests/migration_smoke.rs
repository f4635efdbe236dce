use orch_core::repository::SpecRepository;
use orch_domain::{ParsedSpec, Spec};

// Requires a live Postgres reachable at DATABASE_URL; runs the embedded
// migrations on first checkout and round-trips a single spec row.
#[tokio::test]
async fn migration_allows_spec_roundtrip() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set - skipping migration smoke test");
        return;
    }

    use orch_persistence::{build_dev_pool_from_env, PgSpecRepository, PoolProvider};

    let pool = build_dev_pool_from_env().expect("build pool");
    let repo = PgSpecRepository::new(PoolProvider { pool });

    let spec = Spec::new("migration-smoke", "apiVersion: score.dev/v1b1".to_string(), ParsedSpec::default(), "tester");
    repo.insert_spec(spec.clone()).await.expect("insert spec");

    let fetched = repo.get_spec(spec.id).await.expect("get spec");
    assert_eq!(fetched.name, "migration-smoke");
    assert_eq!(fetched.owner, "tester");
}
