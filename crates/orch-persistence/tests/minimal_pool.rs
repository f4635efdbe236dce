use diesel::RunQueryDsl;
use orch_persistence::build_pool;
use orch_persistence::config::DbConfig;

// Sólo crea y descarta un pool repetidas veces; si un segfault aparece aquí
// la causa es externa a la lógica de repositorios.
#[test]
fn minimal_pool_create_drop_loop() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let cfg = DbConfig::from_env();
    let loops: usize = std::env::var("POOL_LOOPS").ok().and_then(|v| v.parse().ok()).unwrap_or(20);
    for i in 0..loops {
        let pool = build_pool(&cfg.url, 1, 1).expect("pool");
        let mut conn = pool.get().expect("conn");
        let _ = diesel::sql_query("SELECT 1").execute(&mut conn);
        drop(conn);
        drop(pool);
        if i % 5 == 0 {
            eprintln!("minimal_pool iteration={i}");
        }
    }
}
