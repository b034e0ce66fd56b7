use serde_json::Value;

use super::error::FilterError;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOp, FilterWhereInfo, SqlResult};
use crate::database::sql::quote_identifier;

/// Builds `SELECT * FROM <table> [WHERE ..] ORDER BY id ASC LIMIT n`
pub struct Filter {
    table_name: String,
    conditions: Vec<FilterWhereInfo>,
    limit: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            conditions: vec![],
            limit: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(limit) = data.limit { self.limit(limit)?; }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.conditions.extend(FilterWhere::parse(&conditions)?);
        Ok(self)
    }

    /// Adds one predicate; predicates are always combined with AND
    pub fn condition(&mut self, column: impl Into<String>, operator: FilterOp, data: impl Into<Value>) -> &mut Self {
        self.conditions.push(FilterWhereInfo { column: column.into(), operator, data: data.into() });
        self
    }

    pub fn limit(&mut self, limit: i64) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn current_limit(&self) -> Option<i64> {
        self.limit
    }

    /// Columns named by the predicates, in the order they were added
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|c| c.column.as_str())
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = [
            "SELECT *".to_string(),
            format!("FROM {}", quote_identifier(&self.table_name)),
            if where_result.query.is_empty() { String::new() } else { format!("WHERE {}", where_result.query) },
            "ORDER BY \"id\" ASC".to_string(),
            self.build_limit_clause(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = FilterWhere::generate_from(&self.conditions, 0)?;
        Ok(SqlResult { query, params })
    }

    pub fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let first = chars.next().ok_or_else(|| FilterError::InvalidTableName("Table name cannot be empty".to_string()))?;
        if !(first.is_ascii_alphabetic() || first == '_') || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match self.limit {
            Some(l) => format!("LIMIT {}", l),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_selects_everything_in_id_order() {
        let filter = Filter::new("polaris_products").unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(sql.query, "SELECT * FROM \"polaris_products\" ORDER BY \"id\" ASC");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn combines_json_and_programmatic_conditions() {
        let mut filter = Filter::new("polaris_products").unwrap();
        filter
            .assign(FilterData { where_clause: Some(json!({ "InStock": 1 })), limit: Some(10) })
            .unwrap();
        filter.condition("Title", FilterOp::Contains, "desk");

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"polaris_products\" WHERE \"InStock\" = ?1 AND \"Title\" LIKE ?2 ESCAPE '\\' ORDER BY \"id\" ASC LIMIT 10"
        );
        assert_eq!(sql.params, vec![json!(1), json!("%desk%")]);
    }

    #[test]
    fn rejects_bad_table_names_and_limits() {
        assert!(Filter::new("").is_err());
        assert!(Filter::new("products; DROP").is_err());
        assert!(Filter::new("1products").is_err());
        assert!(Filter::new("polaris_products").unwrap().limit(-1).is_err());
    }
}
