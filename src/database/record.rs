use serde::Serialize;
use serde_json::{Map, Value};

/// System fields that are assigned by the store, never by caller input
const SYSTEM_FIELDS: &[&str] = &["id"];

/// Errors that can occur during Record operations
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("System field '{0}' cannot be set via input")]
    SystemFieldNotAllowed(&'static str),
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("No fields given to update")]
    EmptyChangeSet,
    #[error("Row has no integer id")]
    MissingId,
}

/// One row of the data table: the synthetic id plus the CSV-derived columns
/// in table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: i64,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: i64, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Build from a row map (from the store, system fields allowed)
    pub fn from_sql_data(mut data: Map<String, Value>) -> Result<Self, RecordError> {
        let id = data
            .shift_remove("id")
            .and_then(|v| v.as_i64())
            .ok_or(RecordError::MissingId)?;
        Ok(Self { id, fields: data })
    }

    /// Validate caller-supplied fields, rejecting system fields
    pub fn fields_from_input(json: Value) -> Result<Map<String, Value>, RecordError> {
        match json {
            Value::Object(map) => {
                Self::check_input_fields(&map)?;
                Ok(map)
            }
            _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        }
    }

    pub fn check_input_fields(fields: &Map<String, Value>) -> Result<(), RecordError> {
        for &system in SYSTEM_FIELDS {
            if fields.keys().any(|k| k.trim().eq_ignore_ascii_case(system)) {
                return Err(RecordError::SystemFieldNotAllowed(system));
            }
        }
        Ok(())
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        if key == "id" {
            return None;
        }
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Text form of a field, `""` when absent or null
    pub fn text(&self, key: &str) -> String {
        display_value(self.get(key))
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert("id".to_string(), Value::from(self.id));
        map.extend(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(map)
    }
}

/// Human-readable rendering of an optional JSON value
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.to_json()
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Record(id: {}, fields: {})", self.id, self.fields.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_sql_data_splits_off_id() {
        let map = json!({ "id": 7, "Title": "Lamp", "InStock": 1 });
        let record = Record::from_sql_data(map.as_object().unwrap().clone()).unwrap();
        assert_eq!(record.id(), 7);
        assert_eq!(record.text("Title"), "Lamp");
        assert_eq!(record.text("InStock"), "1");
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["Title", "InStock"]);
        assert_eq!(record.to_json(), map);
    }

    #[test]
    fn rejects_rows_without_id() {
        let map = json!({ "Title": "Lamp" });
        assert!(matches!(
            Record::from_sql_data(map.as_object().unwrap().clone()),
            Err(RecordError::MissingId)
        ));
    }

    #[test]
    fn input_may_not_set_id() {
        assert!(matches!(
            Record::fields_from_input(json!({ "id": 3, "Title": "x" })),
            Err(RecordError::SystemFieldNotAllowed("id"))
        ));
        assert!(matches!(
            Record::fields_from_input(json!({ " ID ": 3 })),
            Err(RecordError::SystemFieldNotAllowed("id"))
        ));
        assert!(matches!(Record::fields_from_input(json!([1])), Err(RecordError::InvalidJson(_))));
        assert!(Record::fields_from_input(json!({ "Title": "x" })).is_ok());
    }

    #[test]
    fn serializes_flat_with_id_first() {
        let record = Record::new(2, json!({ "Title": "B" }).as_object().unwrap().clone());
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"id":2,"Title":"B"}"#);
    }
}
