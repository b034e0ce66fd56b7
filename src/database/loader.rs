//! CSV ingest: replaces the data table with the contents of a CSV source.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde_json::{Number, Value};
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::info;

use crate::database::audit::AuditLogger;
use crate::database::sql::{bind_all, placeholders, quote_identifier};
use crate::database::store::{DatabaseError, Store};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read CSV: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV has no header row")]
    EmptyHeader,

    #[error("CSV column {0} has an empty name")]
    EmptyColumnName(usize),

    #[error("CSV column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("CSV column '{0}' collides with the generated identifier")]
    ReservedColumn(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for LoadError {
    fn from(err: sqlx::Error) -> Self {
        LoadError::Database(DatabaseError::Sqlx(err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// A fully parsed CSV, typed and ready to insert
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub columns: Vec<CsvColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl CsvTable {
    pub fn parse<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let names = Self::column_names(rdr.headers()?)?;

        let mut cells: Vec<Vec<String>> = Vec::new();
        for record in rdr.records() {
            let record = record?;
            cells.push(record.iter().map(str::to_string).collect());
        }

        let kinds: Vec<ColumnKind> = (0..names.len())
            .map(|i| infer_kind(cells.iter().map(|row| row[i].as_str())))
            .collect();

        let rows = cells
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(kinds.iter())
                    .map(|(cell, kind)| convert_cell(cell, *kind))
                    .collect()
            })
            .collect();

        let columns = names
            .into_iter()
            .zip(kinds)
            .map(|(name, kind)| CsvColumn { name, kind })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_names(header: &csv::StringRecord) -> Result<Vec<String>, LoadError> {
        if header.is_empty() {
            return Err(LoadError::EmptyHeader);
        }
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(header.len());
        for (i, raw) in header.iter().enumerate() {
            let name = raw.trim().to_string();
            if name.is_empty() {
                return Err(LoadError::EmptyColumnName(i + 1));
            }
            if name.eq_ignore_ascii_case("id") {
                return Err(LoadError::ReservedColumn(name));
            }
            // SQLite identifiers are case-insensitive
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(LoadError::DuplicateColumn(name));
            }
            names.push(name);
        }
        Ok(names)
    }
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = None;
    for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
        let cell_kind = if cell.parse::<i64>().is_ok() {
            ColumnKind::Integer
        } else if cell.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
            ColumnKind::Real
        } else {
            return ColumnKind::Text;
        };
        kind = Some(match (kind, cell_kind) {
            (Some(ColumnKind::Real), _) | (_, ColumnKind::Real) => ColumnKind::Real,
            _ => ColumnKind::Integer,
        });
    }
    kind.unwrap_or(ColumnKind::Text)
}

fn convert_cell(cell: String, kind: ColumnKind) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match kind {
        ColumnKind::Integer => trimmed.parse::<i64>().map(Value::from).unwrap_or(Value::String(cell)),
        ColumnKind::Real => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(cell)),
        ColumnKind::Text => Value::String(cell),
    }
}

/// Where a CSV comes from
pub enum CsvSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

#[derive(Debug, Clone)]
pub struct Loader {
    store: Store,
    audit: AuditLogger,
}

impl Loader {
    pub fn new(store: Store, audit: AuditLogger) -> Self {
        Self { store, audit }
    }

    /// Replace the data table with the CSV's rows; returns the row count.
    ///
    /// The source is parsed completely before the store is touched, and the
    /// replace runs in one transaction, so a failure leaves the previous
    /// table as it was.
    pub async fn load(&self, source: CsvSource<'_>) -> Result<usize, LoadError> {
        let table = match source {
            CsvSource::Path(path) => {
                let bytes = tokio::fs::read(path).await?;
                CsvTable::parse(bytes.as_slice())?
            }
            CsvSource::Bytes(bytes) => CsvTable::parse(bytes)?,
        };
        self.replace(&table).await
    }

    pub async fn load_path(&self, path: impl AsRef<Path>) -> Result<usize, LoadError> {
        self.load(CsvSource::Path(path.as_ref())).await
    }

    pub async fn load_bytes(&self, bytes: &[u8]) -> Result<usize, LoadError> {
        self.load(CsvSource::Bytes(bytes)).await
    }

    pub async fn replace(&self, table: &CsvTable) -> Result<usize, LoadError> {
        let mut tx = self.store.pool().begin().await?;
        Self::write_table(&mut tx, self.store.data_table(), table).await?;
        self.audit.ensure_table(&mut tx).await?;
        tx.commit().await?;

        info!(
            "Loaded {} rows ({} columns) into '{}'",
            table.len(),
            table.columns.len(),
            self.store.data_table()
        );
        Ok(table.len())
    }

    async fn write_table(conn: &mut SqliteConnection, name: &str, table: &CsvTable) -> Result<(), LoadError> {
        let quoted = quote_identifier(name);

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quoted))
            .execute(&mut *conn)
            .await?;

        let mut column_defs = vec!["\"id\" INTEGER".to_string()];
        column_defs.extend(
            table
                .columns
                .iter()
                .map(|c| format!("{} {}", quote_identifier(&c.name), c.kind.sql_type())),
        );
        sqlx::query(&format!("CREATE TABLE {} ({})", quoted, column_defs.join(", ")))
            .execute(&mut *conn)
            .await?;

        let mut column_names = vec!["\"id\"".to_string()];
        column_names.extend(table.columns.iter().map(|c| quote_identifier(&c.name)));
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted,
            column_names.join(", "),
            placeholders(column_names.len(), 0).join(", ")
        );

        for (index, row) in table.rows.iter().enumerate() {
            let id = Value::from(index as i64 + 1);
            let q = bind_all(sqlx::query(&insert), std::slice::from_ref(&id));
            bind_all(q, row).execute(&mut *conn).await?;
        }

        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} (\"id\")",
            quote_identifier(&format!("idx_{}_id", name)),
            quoted
        ))
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trims_header_names_and_infers_types() {
        let csv = " Title ,ShippingDays, Price ,Note\nLamp,3,9.5,\nDesk,,12,fragile\n";
        let table = CsvTable::parse(csv.as_bytes()).unwrap();

        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Title", "ShippingDays", "Price", "Note"]);

        let kinds: Vec<_> = table.columns.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ColumnKind::Text, ColumnKind::Integer, ColumnKind::Real, ColumnKind::Text]);

        assert_eq!(table.rows[0], vec![json!("Lamp"), json!(3), json!(9.5), Value::Null]);
        assert_eq!(table.rows[1], vec![json!("Desk"), Value::Null, json!(12.0), json!("fragile")]);
    }

    #[test]
    fn header_only_csv_has_no_rows() {
        let table = CsvTable::parse("Title,Description\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns[0].kind, ColumnKind::Text);
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(CsvTable::parse("".as_bytes()), Err(LoadError::EmptyHeader)));
        assert!(matches!(CsvTable::parse("Title, \nA,B\n".as_bytes()), Err(LoadError::EmptyColumnName(2))));
        assert!(matches!(CsvTable::parse("Title,title\nA,B\n".as_bytes()), Err(LoadError::DuplicateColumn(_))));
        assert!(matches!(CsvTable::parse("id,Title\n1,A\n".as_bytes()), Err(LoadError::ReservedColumn(_))));
    }

    #[test]
    fn rejects_ragged_rows() {
        assert!(matches!(CsvTable::parse("Title,InStock\nA,1,extra\n".as_bytes()), Err(LoadError::Csv(_))));
    }

    #[test]
    fn digit_columns_are_numeric() {
        assert_eq!(infer_kind(["560001", "110001"].into_iter()), ColumnKind::Integer);
        assert_eq!(infer_kind(["1", "2.5"].into_iter()), ColumnKind::Real);
        assert_eq!(infer_kind(["1", "n/a"].into_iter()), ColumnKind::Text);
        assert_eq!(infer_kind(["inf"].into_iter()), ColumnKind::Text);
        assert_eq!(infer_kind(["", " "].into_iter()), ColumnKind::Text);
    }
}
