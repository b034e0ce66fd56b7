use anyhow::anyhow;
use serde_json::{json, Map, Value};

use crate::cli::utils::{output_error, output_record, output_records, output_success, read_stdin_object};
use crate::cli::OutputFormat;
use crate::database::models::{validate_columns, Visibility, VISIBILITY_COLUMN};
use crate::database::{AuditTimestamps, Backend, Record};
use crate::filter::FilterOp;
use crate::types::MutationOutcome;

pub struct ListArgs {
    pub title: Option<String>,
    pub visibility: Option<String>,
    pub where_clause: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list(backend: &Backend, args: ListArgs, output_format: &OutputFormat) -> anyhow::Result<()> {
    let records = backend.records();
    let mut filter = records.filter()?;

    if let Some(where_json) = args.where_clause.as_deref() {
        let conditions: Value = serde_json::from_str(where_json)?;
        filter.where_clause(conditions)?;
    }
    if let Some(title) = args.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        filter.condition(records.title_column(), FilterOp::Contains, title);
    }
    if let Some(visibility) = Visibility::from_selector(args.visibility.as_deref()).map_err(|e| anyhow!(e))? {
        filter.condition(VISIBILITY_COLUMN, FilterOp::Eq, visibility.as_str());
    }
    if let Some(limit) = args.limit {
        filter.limit(limit)?;
    }

    let found = records.list(filter).await?;
    output_records(output_format, &found)
}

pub async fn get(backend: &Backend, id: i64, output_format: &OutputFormat) -> anyhow::Result<()> {
    match backend.records().get(id).await? {
        Some(record) => output_record(output_format, &record),
        None => Err(anyhow!("No product with id {}", id)),
    }
}

pub async fn create(backend: &Backend, output_format: &OutputFormat) -> anyhow::Result<()> {
    let fields = product_fields(read_stdin_object()?)?;
    let created = backend.records().create(fields).await?;
    report(output_format, "Created", created.result, created.audit)
}

pub async fn update(backend: &Backend, id: i64, output_format: &OutputFormat) -> anyhow::Result<()> {
    let fields = product_fields(read_stdin_object()?)?;
    let updated = backend.records().update(id, fields).await?;
    match updated.result {
        MutationOutcome::Applied => report(output_format, "Updated", id, updated.audit),
        MutationOutcome::NotFound => Err(anyhow!("No product with id {}", id)),
    }
}

pub async fn delete(backend: &Backend, id: i64, output_format: &OutputFormat) -> anyhow::Result<()> {
    let deleted = backend.records().delete(id).await?;
    match deleted.result {
        MutationOutcome::Applied => report(output_format, "Deleted", id, deleted.audit),
        MutationOutcome::NotFound => Err(anyhow!("No product with id {}", id)),
    }
}

/// Caller fields with the product columns validated the way the HTTP forms do
fn product_fields(input: Map<String, Value>) -> anyhow::Result<Map<String, Value>> {
    let fields = Record::fields_from_input(Value::Object(input))?;
    if let Err(errors) = validate_columns(&fields) {
        let mut problems: Vec<String> = errors.into_iter().map(|(field, message)| format!("{}: {}", field, message)).collect();
        problems.sort();
        return Err(anyhow!("Invalid product: {}", problems.join("; ")));
    }
    Ok(fields)
}

fn report(output_format: &OutputFormat, verb: &str, id: i64, audit: Option<AuditTimestamps>) -> anyhow::Result<()> {
    match audit {
        Some(stamps) => output_success(
            output_format,
            &format!("{} product {} (logged at {} / {})", verb, id, stamps.local, stamps.utc),
            Some(json!({ "id": id, "logged": true, "timestamp_local": stamps.local, "timestamp_utc": stamps.utc })),
        ),
        None => {
            output_success(output_format, &format!("{} product {}", verb, id), Some(json!({ "id": id, "logged": false })))?;
            output_error(output_format, "Operation was applied but could not be logged", Some("AUDIT_FAILED"))
        }
    }
}
