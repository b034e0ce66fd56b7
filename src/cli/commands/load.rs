use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::Backend;

pub async fn handle(backend: &Backend, csv: &str, output_format: &OutputFormat) -> anyhow::Result<()> {
    let rows = backend.loader().load_path(csv).await?;
    output_success(
        output_format,
        &format!("Loaded {} rows from {} into '{}'", rows, csv, backend.records().table_name()),
        Some(json!({ "rows": rows })),
    )
}
