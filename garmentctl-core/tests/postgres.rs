//! Full runs against a live PostgreSQL database
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use std::path::PathBuf;

use garmentctl_core::{create_schema, reset_database, run_suite, HarnessConfig};

fn config() -> HarnessConfig {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    let mut config = HarnessConfig::default()
        .with_seed(Some(root.join("sql").join("data.sql")))
        .with_schema(Some(root.join("sql").join("schema.sql")));
    config
        .apply_env(|key| std::env::var(key).ok())
        .expect("valid environment");
    config
}

// One test, since every run rewrites the same table.
#[tokio::test]
#[ignore = "requires database"]
async fn reset_then_full_suite() {
    let config = config();
    create_schema(&config).await.unwrap();

    assert_eq!(reset_database(&config).await.unwrap(), 30);
    assert_eq!(reset_database(&config).await.unwrap(), 30);

    let report = run_suite(&config).await.unwrap();
    assert_eq!(report.backend, "postgres");
    assert_eq!(report.baseline, Some(30));
    assert!(report.is_success(), "{}", report.render_text());
}
