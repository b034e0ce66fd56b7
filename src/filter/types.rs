use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$contains")] Contains,
}

impl FilterOp {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$eq" => Some(FilterOp::Eq),
            "$contains" => Some(FilterOp::Contains),
            _ => None,
        }
    }
}

/// Request body for filtered reads: `{"where": {...}, "limit": n}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    #[serde(rename = "where", alias = "where_clause", default)]
    pub where_clause: Option<serde_json::Value>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}
