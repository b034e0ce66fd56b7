use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};
use crate::database::sql::quote_identifier;

/// Translates a JSON where-object into a conjunction of bound SQL predicates.
///
/// Every value ends up in `param_values`; the generated SQL only ever contains
/// quoted identifiers and `?N` placeholders.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.parse_where_data(where_data)?;
        filter_where.build()
    }

    /// Same as [`FilterWhere::generate`] for conditions assembled in code
    pub fn generate_from(conditions: &[FilterWhereInfo], starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        for condition in conditions {
            Self::validate_column(&condition.column)?;
        }
        filter_where.conditions = conditions.to_vec();
        filter_where.build()
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    pub fn parse(where_data: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let mut filter_where = Self::new(0);
        filter_where.parse_where_data(where_data)?;
        Ok(filter_where.conditions)
    }

    fn build(&mut self) -> Result<(String, Vec<Value>), FilterError> {
        let conditions_snapshot = std::mem::take(&mut self.conditions);
        let mut sql_conditions = Vec::with_capacity(conditions_snapshot.len());
        for condition in &conditions_snapshot {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        self.conditions = conditions_snapshot;
        Ok((sql_conditions.join(" AND "), self.param_values.clone()))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        // Only conjunctions of field predicates are supported
                        return Err(FilterError::UnsupportedOperator(key.clone()));
                    }
                    self.parse_field_condition(key, value)?;
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        Self::validate_column(field)?;
        if let Value::Object(obj) = value {
            if obj.is_empty() {
                return Err(FilterError::InvalidOperatorData(format!("no operator given for '{}'", field)));
            }
            for (op_key, op_val) in obj {
                let operator = FilterOp::from_key(op_key)
                    .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                self.conditions.push(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() });
            }
        } else {
            // Implicit equality: { field: value }
            self.conditions.push(FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() });
        }
        Ok(())
    }

    fn validate_column(column: &str) -> Result<(), FilterError> {
        if column.trim().is_empty() {
            return Err(FilterError::InvalidColumn("Column name cannot be empty".to_string()));
        }
        Ok(())
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = quote_identifier(&condition.column);
        match condition.operator {
            FilterOp::Eq => match &condition.data {
                Value::Null => Ok(format!("{} IS NULL", quoted_column)),
                Value::Array(_) | Value::Object(_) => Err(FilterError::InvalidOperatorData(format!(
                    "$eq on '{}' needs a scalar value",
                    condition.column
                ))),
                scalar => Ok(format!("{} = {}", quoted_column, self.param(scalar.clone()))),
            },
            FilterOp::Contains => {
                let needle = match &condition.data {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(FilterError::InvalidOperatorData(format!(
                            "$contains on '{}' needs a string",
                            condition.column
                        )))
                    }
                };
                let pattern = format!("%{}%", escape_like(&needle));
                Ok(format!("{} LIKE {} ESCAPE '\\'", quoted_column, self.param(Value::String(pattern))))
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("?{}", self.param_index)
    }
}

/// Escape LIKE wildcards so the needle matches literally
pub fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
