//! Small SQL helpers shared by the filter builder, loader and repository.

use serde_json::{Map, Number, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Quote SQL identifier to prevent injection
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `?1, ?2, ...` starting after `offset`
pub fn placeholders(count: usize, offset: usize) -> Vec<String> {
    (offset + 1..=offset + count).map(|i| format!("?{}", i)).collect()
}

pub fn bind_param<'q>(q: SqliteQuery<'q>, v: &Value) -> SqliteQuery<'q> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.clone()),
        // Nested values are stored as their JSON text
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}

pub fn bind_all<'q>(mut q: SqliteQuery<'q>, params: &[Value]) -> SqliteQuery<'q> {
    for p in params {
        q = bind_param(q, p);
    }
    q
}

/// Convert a row of unknown shape into an ordered JSON map
pub fn row_to_map(row: &SqliteRow) -> Result<Map<String, Value>, sqlx::Error> {
    let mut map = Map::new();

    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_ascii_uppercase();
            match storage.as_str() {
                "INTEGER" | "BOOLEAN" => row
                    .try_get::<i64, _>(i)
                    .map(Value::from)
                    .or_else(|_| fallback_value(row, i))?,
                "REAL" => row
                    .try_get::<f64, _>(i)
                    .map(float_value)
                    .or_else(|_| fallback_value(row, i))?,
                "BLOB" => row
                    .try_get::<Vec<u8>, _>(i)
                    .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))?,
                _ => fallback_value(row, i)?,
            }
        };
        map.insert(column.name().to_string(), value);
    }

    Ok(map)
}

fn fallback_value(row: &SqliteRow, i: usize) -> Result<Value, sqlx::Error> {
    if let Ok(s) = row.try_get::<String, _>(i) {
        Ok(Value::String(s))
    } else if let Ok(v) = row.try_get::<i64, _>(i) {
        Ok(Value::from(v))
    } else if let Ok(v) = row.try_get::<f64, _>(i) {
        Ok(float_value(v))
    } else {
        Ok(Value::Null)
    }
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}
