#![allow(dead_code)]

use anyhow::Result;
use serde_json::{Map, Value};
use tempfile::TempDir;

use polaris_backend::config::{AppConfig, AuditPolicy};
use polaris_backend::database::Backend;

pub const PRODUCTS_CSV: &str = "\
Title,Description,PriceStable,InStock,SellerPincode,CustomerPincode,ShippingDays,PredictedVisibility
Desk Lamp,Warm light,1,1,560001,110001,2,High
Office Chair,Mesh back,0,1,400001,600001,5,Medium
Bookshelf,Five tiers,1,0,700001,500001,7,Low
";

/// A backend over a throwaway SQLite file; the file goes away on drop
pub struct TestBackend {
    pub backend: Backend,
    pub config: AppConfig,
    _dir: TempDir,
}

impl std::ops::Deref for TestBackend {
    type Target = Backend;

    fn deref(&self) -> &Backend {
        &self.backend
    }
}

pub fn test_config(dir: &TempDir, policy: AuditPolicy) -> AppConfig {
    let mut config = AppConfig::development();
    config.store.path = dir.path().join("polaris_test.db").to_string_lossy().into_owned();
    config.api.default_csv = None;
    config.filter.debug_logging = false;
    config.audit.policy = policy;
    config
}

pub async fn backend_with(policy: AuditPolicy) -> Result<TestBackend> {
    let dir = tempfile::tempdir()?;
    let config = test_config(&dir, policy);
    let backend = Backend::open(&config).await?;
    Ok(TestBackend { backend, config, _dir: dir })
}

pub async fn backend() -> Result<TestBackend> {
    backend_with(AuditPolicy::BestEffort).await
}

/// Backend with [`PRODUCTS_CSV`] already loaded
pub async fn loaded_backend() -> Result<TestBackend> {
    let test = backend().await?;
    test.loader().load_bytes(PRODUCTS_CSV.as_bytes()).await?;
    Ok(test)
}

pub fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

pub async fn ids(backend: &Backend) -> Result<Vec<i64>> {
    let records = backend.records();
    Ok(records.list(records.filter()?).await?.iter().map(|r| r.id()).collect())
}

/// Make every insert into the operations log fail
pub async fn reject_log_writes(backend: &Backend) -> Result<()> {
    let sql = format!(
        "CREATE TRIGGER reject_log_writes BEFORE INSERT ON \"{}\" BEGIN SELECT RAISE(ABORT, 'log rejected'); END",
        backend.store().ops_table()
    );
    sqlx::query(&sql).execute(backend.store().pool()).await?;
    Ok(())
}
