mod common;

use std::io::Write;

use anyhow::Result;
use serde_json::json;

use polaris_backend::database::{DatabaseError, LoadError};

#[tokio::test]
async fn load_assigns_ids_in_source_order() -> Result<()> {
    let test = common::backend().await?;

    let rows = test.loader().load_bytes(common::PRODUCTS_CSV.as_bytes()).await?;
    assert_eq!(rows, 3);

    let records = test.records().list(test.records().filter()?).await?;
    let ids: Vec<i64> = records.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let titles: Vec<String> = records.iter().map(|r| r.text("Title")).collect();
    assert_eq!(titles, vec!["Desk Lamp", "Office Chair", "Bookshelf"]);

    // Numeric columns come back as numbers
    assert_eq!(records[0].get("ShippingDays"), Some(&json!(2)));
    assert_eq!(records[1].get("PriceStable"), Some(&json!(0)));
    Ok(())
}

#[tokio::test]
async fn reload_resets_ids() -> Result<()> {
    let test = common::loaded_backend().await?;
    test.records().create(common::fields(json!({ "Title": "Extra" }))).await?;
    test.records().delete(1).await?;
    assert_eq!(common::ids(&test).await?, vec![2, 3, 4]);

    test.loader().load_bytes(common::PRODUCTS_CSV.as_bytes()).await?;
    assert_eq!(common::ids(&test).await?, vec![1, 2, 3]);

    test.loader().load_bytes(common::PRODUCTS_CSV.as_bytes()).await?;
    assert_eq!(common::ids(&test).await?, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn load_replaces_schema() -> Result<()> {
    let test = common::loaded_backend().await?;

    test.loader().load_bytes(b" Name , Qty \nbolt,10\n").await?;

    let record = test.records().get(1).await?.expect("row 1");
    assert_eq!(record.columns().collect::<Vec<_>>(), vec!["Name", "Qty"]);
    assert_eq!(record.get("Qty"), Some(&json!(10)));
    assert!(test.records().get(2).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn malformed_csv_leaves_previous_table() -> Result<()> {
    let test = common::loaded_backend().await?;

    let ragged = test.loader().load_bytes(b"Title,InStock\nA,1\nB,1,extra\n").await;
    assert!(matches!(ragged, Err(LoadError::Csv(_))), "got {:?}", ragged);

    let duplicate = test.loader().load_bytes(b"Title,TITLE\nA,B\n").await;
    assert!(matches!(duplicate, Err(LoadError::DuplicateColumn(_))), "got {:?}", duplicate);

    let reserved = test.loader().load_bytes(b"id,Title\n9,A\n").await;
    assert!(matches!(reserved, Err(LoadError::ReservedColumn(_))), "got {:?}", reserved);

    assert_eq!(common::ids(&test).await?, vec![1, 2, 3]);
    assert_eq!(test.records().get(1).await?.expect("row 1").text("Title"), "Desk Lamp");
    Ok(())
}

#[tokio::test]
async fn load_writes_no_log_entry() -> Result<()> {
    let test = common::loaded_backend().await?;
    assert!(test.operations(None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn loads_from_path() -> Result<()> {
    let test = common::backend().await?;

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(common::PRODUCTS_CSV.as_bytes())?;
    file.flush()?;

    let rows = test.loader().load_path(file.path()).await?;
    assert_eq!(rows, 3);

    let missing = test.loader().load_path("/nonexistent/polaris.csv").await;
    assert!(matches!(missing, Err(LoadError::Io(_))));
    assert_eq!(common::ids(&test).await?, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn header_only_csv_gives_empty_table() -> Result<()> {
    let test = common::backend().await?;
    let rows = test.loader().load_bytes(b"Title,Description\n").await?;
    assert_eq!(rows, 0);
    assert!(common::ids(&test).await?.is_empty());

    let created = test.records().create(common::fields(json!({ "Title": "First" }))).await?;
    assert_eq!(created.result, 1);
    Ok(())
}

#[tokio::test]
async fn create_before_any_load_is_not_found() -> Result<()> {
    let test = common::backend().await?;
    assert!(common::ids(&test).await?.is_empty());
    assert!(test.records().get(1).await?.is_none());

    let result = test.records().create(common::fields(json!({ "Title": "A" }))).await;
    assert!(matches!(result, Err(DatabaseError::NotFound(_))), "got {:?}", result);
    Ok(())
}
