mod common;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;

use polaris_backend::config::AuditPolicy;
use polaris_backend::database::{AuditLogger, Backend, NewLogEntry};
use polaris_backend::types::AuditAction;

#[tokio::test]
async fn every_mutation_writes_one_entry_with_dual_stamps() -> Result<()> {
    let test = common::loaded_backend().await?;

    let created = test.records().create(common::fields(json!({ "Title": "Lamp Shade" }))).await?;
    test.records().update(created.result, common::fields(json!({ "InStock": 0 }))).await?;
    test.records().delete(created.result).await?;

    let log = test.operations(None).await?;
    assert_eq!(log.len(), 3);
    let actions: Vec<&str> = log.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["DELETE", "UPDATE", "CREATE"]);

    for entry in &log {
        assert_eq!(entry.target_id, Some(created.result));
        assert_eq!(entry.target_table.as_deref(), Some(test.config.store.data_table.as_str()));

        assert!(entry.timestamp_utc.ends_with('Z'), "utc stamp {}", entry.timestamp_utc);
        let utc = DateTime::parse_from_rfc3339(&entry.timestamp_utc)?;
        assert_eq!(utc.offset().local_minus_utc(), 0);

        let local = DateTime::parse_from_rfc3339(&entry.timestamp_local)?;
        assert_eq!(local.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!(local.with_timezone(&Utc), utc.with_timezone(&Utc));
    }

    // Newest first
    assert!(log.windows(2).all(|pair| pair[0].id > pair[1].id));
    Ok(())
}

#[tokio::test]
async fn mutations_return_the_stamps_they_wrote() -> Result<()> {
    let test = common::loaded_backend().await?;

    let created = test.records().create(common::fields(json!({ "Title": "Mat" }))).await?;
    let stamps = created.audit.expect("logged");

    let log = test.operations(Some(1)).await?;
    assert_eq!(log[0].timestamp_utc, stamps.utc);
    assert_eq!(log[0].timestamp_local, stamps.local);
    Ok(())
}

#[tokio::test]
async fn local_zone_is_configurable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = common::test_config(&dir, AuditPolicy::Strict);
    config.audit.timezone = "America/New_York".to_string();

    let backend = Backend::open(&config).await?;
    backend.loader().load_bytes(b"Title\nA\n").await?;
    backend.records().delete(1).await?;

    let entry = &backend.operations(None).await?[0];
    let local = DateTime::parse_from_rfc3339(&entry.timestamp_local)?;
    let offset = local.offset().local_minus_utc();
    assert!(offset == -5 * 3600 || offset == -4 * 3600, "offset {}", offset);

    config.audit.timezone = "Not/AZone".to_string();
    assert!(Backend::open(&config).await.is_err());
    Ok(())
}

#[tokio::test]
async fn logger_accepts_free_text_and_untargeted_entries() -> Result<()> {
    let test = common::backend().await?;
    let logger = AuditLogger::new(test.store().ops_table(), "UTC")?;

    let mut conn = test.store().acquire().await?;
    logger
        .record(&mut conn, NewLogEntry::new(AuditAction::Other("IMPORT".to_string())).metadata("nightly"))
        .await?;
    logger.record(&mut conn, NewLogEntry::new(AuditAction::Create).target("elsewhere", 8)).await?;

    let entries = logger.recent(&mut conn, 10).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].target_table.as_deref(), Some("elsewhere"));
    assert_eq!(entries[1].action, "IMPORT");
    assert_eq!(entries[1].target_table, None);
    assert_eq!(entries[1].target_id, None);
    assert_eq!(entries[1].metadata.as_deref(), Some("nightly"));
    assert!(entries[1].timestamp_local.ends_with("+00:00"));
    Ok(())
}

#[tokio::test]
async fn recent_honours_limit() -> Result<()> {
    let test = common::loaded_backend().await?;
    for _ in 0..5 {
        test.records().create(common::fields(json!({ "Title": "Filler" }))).await?;
    }

    let latest = test.operations(Some(2)).await?;
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].target_id, Some(8));
    assert_eq!(latest[1].target_id, Some(7));

    assert_eq!(test.operations(None).await?.len(), 5);
    assert!(test.operations(Some(0)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn log_survives_reload() -> Result<()> {
    let test = common::loaded_backend().await?;
    test.records().delete(2).await?;

    test.loader().load_bytes(common::PRODUCTS_CSV.as_bytes()).await?;

    let log = test.operations(None).await?;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, "DELETE");
    Ok(())
}
