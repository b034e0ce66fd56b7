use std::io::Read;

use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;
use crate::database::{OperationLogEntry, Record};

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let (Some(Value::Object(extra)), Some(body)) = (data, response.as_object_mut()) {
                body.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });
            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Records as a JSON array, or a tab-separated table with a header row
pub fn output_records(output_format: &OutputFormat, records: &[Record]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "records": records }))?);
        }
        OutputFormat::Text => {
            let Some(first) = records.first() else {
                println!("No records");
                return Ok(());
            };
            let columns: Vec<&str> = first.columns().collect();
            println!("id\t{}", columns.join("\t"));
            for record in records {
                let cells: Vec<String> = columns.iter().map(|c| record.text(c)).collect();
                println!("{}\t{}", record.id(), cells.join("\t"));
            }
            println!("({} rows)", records.len());
        }
    }
    Ok(())
}

pub fn output_record(output_format: &OutputFormat, record: &Record) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Text => {
            println!("id: {}", record.id());
            for column in record.columns() {
                println!("{}: {}", column, record.text(column));
            }
        }
    }
    Ok(())
}

pub fn output_operations(output_format: &OutputFormat, entries: &[OperationLogEntry]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "operations": entries }))?);
        }
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No operations logged");
            }
            for entry in entries {
                println!(
                    "#{} {} {}:{} at {} ({}){}",
                    entry.id,
                    entry.action,
                    entry.target_table.as_deref().unwrap_or("-"),
                    entry.target_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
                    entry.timestamp_local,
                    entry.timestamp_utc,
                    entry.metadata.as_deref().map(|m| format!(" {}", m)).unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

/// Read a JSON object from stdin
pub fn read_stdin_object() -> anyhow::Result<Map<String, Value>> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    parse_object(&input)
}

pub fn parse_object(input: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(input.trim())? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow::anyhow!("Expected a JSON object, got {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_objects() {
        let map = parse_object(" {\"Title\": \"Lamp\"}\n").unwrap();
        assert_eq!(map["Title"], "Lamp");
        assert!(parse_object("[1, 2]").is_err());
        assert!(parse_object("not json").is_err());
    }
}
