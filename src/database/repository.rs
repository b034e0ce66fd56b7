use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteQueryResult;
use sqlx::{Row, SqliteConnection};
use tracing::{debug, error, warn};

use crate::config::{AuditConfig, AuditPolicy, FilterConfig};
use crate::database::audit::{AuditLogger, AuditTimestamps, NewLogEntry};
use crate::database::record::{display_value, Record, RecordError};
use crate::database::sql::{bind_all, placeholders, quote_identifier, row_to_map};
use crate::database::store::{DatabaseError, Store};
use crate::filter::{Filter, FilterData, FilterError};
use crate::types::{AuditAction, MutationOutcome};

/// A mutation result together with the audit stamps written for it.
///
/// `audit` is `None` only under [`AuditPolicy::BestEffort`] when the log write
/// failed after the mutation had already been applied.
#[derive(Debug, Clone, Serialize)]
pub struct Audited<T> {
    pub result: T,
    pub audit: Option<AuditTimestamps>,
}

impl<T> Audited<T> {
    pub fn logged(&self) -> bool {
        self.audit.is_some()
    }
}

enum Change<'a> {
    Insert(&'a Map<String, Value>),
    Update(i64, &'a Map<String, Value>),
    Delete(i64),
}

impl Change<'_> {
    fn action(&self) -> AuditAction {
        match self {
            Change::Insert(_) => AuditAction::Create,
            Change::Update(..) => AuditAction::Update,
            Change::Delete(_) => AuditAction::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Applied {
    id: i64,
    outcome: MutationOutcome,
}

/// Create / read / update / delete over the data table. Every mutating call
/// appends exactly one operations-log entry, including calls whose target id
/// did not exist.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    store: Store,
    audit: AuditLogger,
    policy: AuditPolicy,
    title_column: String,
    default_limit: i64,
    max_limit: Option<i64>,
    debug_logging: bool,
}

impl RecordRepository {
    pub fn new(store: Store, audit: AuditLogger, filter: &FilterConfig, audit_config: &AuditConfig) -> Self {
        Self {
            store,
            audit,
            policy: audit_config.policy,
            title_column: audit_config.title_column.clone(),
            default_limit: filter.default_limit,
            max_limit: filter.max_limit,
            debug_logging: filter.debug_logging,
        }
    }

    pub fn table_name(&self) -> &str {
        self.store.data_table()
    }

    pub fn title_column(&self) -> &str {
        &self.title_column
    }

    /// Empty filter over the data table
    pub fn filter(&self) -> Result<Filter, DatabaseError> {
        Ok(Filter::new(self.store.data_table())?)
    }

    /// Rows matching every predicate, ascending by id, capped at the limit
    pub async fn list(&self, mut filter: Filter) -> Result<Vec<Record>, DatabaseError> {
        let limit = self.effective_limit(filter.current_limit());
        filter.limit(limit)?;

        let mut conn = self.store.acquire().await?;
        if !Store::table_exists(&mut conn, self.store.data_table()).await? {
            return Ok(vec![]);
        }

        let known = Store::table_columns(&mut conn, self.store.data_table()).await?;
        if let Some(unknown) = filter.columns().find(|c| !known.iter().any(|k| k.eq_ignore_ascii_case(c))) {
            return Err(FilterError::InvalidColumn(format!("No column named '{}'", unknown)).into());
        }

        let sql = filter.to_sql()?;
        if self.debug_logging {
            debug!("list: {} params={:?}", sql.query, sql.params);
        }

        let rows = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_all(&mut *conn)
            .await?;
        rows.iter()
            .map(|row| -> Result<Record, DatabaseError> { Ok(Record::from_sql_data(row_to_map(row)?)?) })
            .collect()
    }

    /// [`RecordRepository::list`] driven by a JSON filter body
    pub async fn find(&self, filter_data: FilterData) -> Result<Vec<Record>, DatabaseError> {
        let mut filter = self.filter()?;
        filter.assign(filter_data)?;
        self.list(filter).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Record>, DatabaseError> {
        let mut conn = self.store.acquire().await?;
        if !Store::table_exists(&mut conn, self.store.data_table()).await? {
            return Ok(None);
        }

        let sql = format!("SELECT * FROM {} WHERE \"id\" = ?1", quote_identifier(self.store.data_table()));
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
        row.map(|row| -> Result<Record, DatabaseError> { Ok(Record::from_sql_data(row_to_map(&row)?)?) })
            .transpose()
    }

    /// Insert one row with the next id (max + 1, or 1 on an empty table)
    pub async fn create(&self, fields: Map<String, Value>) -> Result<Audited<i64>, DatabaseError> {
        Record::check_input_fields(&fields)?;
        let done = self.execute(Change::Insert(&fields)).await?;
        Ok(Audited { result: done.result.id, audit: done.audit })
    }

    /// Set the named fields on the row with `id`; other columns are untouched
    pub async fn update(&self, id: i64, fields: Map<String, Value>) -> Result<Audited<MutationOutcome>, DatabaseError> {
        Record::check_input_fields(&fields)?;
        if fields.is_empty() {
            return Err(RecordError::EmptyChangeSet.into());
        }
        let done = self.execute(Change::Update(id, &fields)).await?;
        Ok(Audited { result: done.result.outcome, audit: done.audit })
    }

    pub async fn delete(&self, id: i64) -> Result<Audited<MutationOutcome>, DatabaseError> {
        let done = self.execute(Change::Delete(id)).await?;
        Ok(Audited { result: done.result.outcome, audit: done.audit })
    }

    fn effective_limit(&self, requested: Option<i64>) -> i64 {
        let limit = requested.unwrap_or(self.default_limit);
        match self.max_limit {
            Some(max) if limit > max => {
                warn!("Limit {} exceeds max {}, capping to max", limit, max);
                max
            }
            _ => limit,
        }
    }

    async fn execute(&self, change: Change<'_>) -> Result<Audited<Applied>, DatabaseError> {
        let table = self.store.data_table();
        let action = change.action();

        let done = match self.policy {
            AuditPolicy::Strict => {
                let mut tx = self.store.pool().begin().await?;
                let applied = Self::apply(&mut tx, table, &change).await?;
                let stamps = self.audit.record(&mut tx, self.log_entry(&change, applied.id)).await?;
                tx.commit().await?;
                Audited { result: applied, audit: Some(stamps) }
            }
            AuditPolicy::BestEffort => {
                let mut conn = self.store.acquire().await?;
                let applied = Self::apply(&mut conn, table, &change).await?;
                let audit = match self.audit.record(&mut conn, self.log_entry(&change, applied.id)).await {
                    Ok(stamps) => Some(stamps),
                    Err(e) => {
                        error!("Audit write failed after {} on {} id={}: {}", action, table, applied.id, e);
                        None
                    }
                };
                Audited { result: applied, audit }
            }
        };

        if done.result.outcome == MutationOutcome::NotFound {
            warn!("{} on {}: no record with id {}", action, table, done.result.id);
        }
        Ok(done)
    }

    /// Runs the mutation as the first statement on `conn`, so inside a
    /// transaction the write lock is taken up front and waits on the busy
    /// timeout. A missing data table reads as not-found.
    async fn apply(conn: &mut SqliteConnection, table: &str, change: &Change<'_>) -> Result<Applied, DatabaseError> {
        let quoted = quote_identifier(table);

        match *change {
            Change::Insert(fields) => {
                // Read-max and insert in one statement so two writers cannot
                // compute the same id
                let mut columns = vec!["\"id\"".to_string()];
                columns.extend(fields.keys().map(|k| quote_identifier(k)));
                let mut values = vec!["COALESCE(MAX(\"id\"), 0) + 1".to_string()];
                values.extend(placeholders(fields.len(), 0));

                let sql = format!(
                    "INSERT INTO {} ({}) SELECT {} FROM {} RETURNING \"id\"",
                    quoted,
                    columns.join(", "),
                    values.join(", "),
                    quoted
                );
                let params: Vec<Value> = fields.values().cloned().collect();
                match bind_all(sqlx::query(&sql), &params).fetch_one(&mut *conn).await {
                    Ok(row) => {
                        let id: i64 = row.try_get("id")?;
                        Ok(Applied { id, outcome: MutationOutcome::Applied })
                    }
                    Err(e) if is_missing_table(&e) => {
                        Err(DatabaseError::NotFound(format!("Table '{}' has not been loaded", table)))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Change::Update(id, fields) => {
                let assignments: Vec<String> = fields
                    .keys()
                    .zip(placeholders(fields.len(), 0))
                    .map(|(column, placeholder)| format!("{} = {}", quote_identifier(column), placeholder))
                    .collect();
                let sql = format!(
                    "UPDATE {} SET {} WHERE \"id\" = ?{}",
                    quoted,
                    assignments.join(", "),
                    fields.len() + 1
                );
                let params: Vec<Value> = fields.values().cloned().collect();
                let result = bind_all(sqlx::query(&sql), &params).bind(id).execute(&mut *conn).await;
                Self::affected(id, result)
            }
            Change::Delete(id) => {
                let sql = format!("DELETE FROM {} WHERE \"id\" = ?1", quoted);
                let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await;
                Self::affected(id, result)
            }
        }
    }

    fn affected(id: i64, result: Result<SqliteQueryResult, sqlx::Error>) -> Result<Applied, DatabaseError> {
        match result {
            Ok(done) => Ok(Applied { id, outcome: MutationOutcome::from_rows_affected(done.rows_affected()) }),
            Err(e) if is_missing_table(&e) => Ok(Applied { id, outcome: MutationOutcome::NotFound }),
            Err(e) => Err(e.into()),
        }
    }

    fn log_entry(&self, change: &Change<'_>, id: i64) -> NewLogEntry<'_> {
        let entry = NewLogEntry::new(change.action()).target(self.store.data_table(), id);
        match *change {
            Change::Insert(fields) => entry.metadata(display_value(fields.get(&self.title_column))),
            Change::Update(_, fields) => entry.metadata(Value::Object(fields.clone()).to_string()),
            Change::Delete(_) => entry,
        }
    }
}

fn is_missing_table(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.message().starts_with("no such table"))
}
