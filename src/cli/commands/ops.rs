use crate::cli::utils::output_operations;
use crate::cli::OutputFormat;
use crate::database::Backend;

pub async fn handle(backend: &Backend, limit: Option<i64>, output_format: &OutputFormat) -> anyhow::Result<()> {
    let entries = backend.operations(limit).await?;
    output_operations(output_format, &entries)
}
