//! Append-only operations log.
//!
//! One row per mutating call, stamped twice: once in UTC and once in the
//! configured zone. Rows are never updated or deleted.

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use crate::database::sql::quote_identifier;
use crate::database::store::DatabaseError;
use crate::filter::Filter;
use crate::types::AuditAction;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct OperationLogEntry {
    pub id: i64,
    pub action: String,
    pub target_table: Option<String>,
    pub target_id: Option<i64>,
    pub timestamp_local: String,
    pub timestamp_utc: String,
    pub metadata: Option<String>,
}

/// Both stamps written for an entry, returned for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditTimestamps {
    pub local: String,
    pub utc: String,
}

/// Entry to append; `id` and timestamps are filled in by the logger
#[derive(Debug, Clone)]
pub struct NewLogEntry<'a> {
    pub action: AuditAction,
    pub target_table: Option<&'a str>,
    pub target_id: Option<i64>,
    pub metadata: Option<String>,
}

impl<'a> NewLogEntry<'a> {
    pub fn new(action: AuditAction) -> Self {
        Self { action, target_table: None, target_id: None, metadata: None }
    }

    pub fn target(mut self, table: &'a str, id: i64) -> Self {
        self.target_table = Some(table);
        self.target_id = Some(id);
        self
    }

    pub fn metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AuditLogger {
    table: String,
    timezone: Tz,
}

impl AuditLogger {
    pub fn new(table: impl Into<String>, timezone: &str) -> Result<Self, DatabaseError> {
        let table = table.into();
        Filter::validate_table_name(&table)?;
        let timezone = timezone
            .parse::<Tz>()
            .map_err(|_| DatabaseError::InvalidTimezone(timezone.to_string()))?;
        Ok(Self { table, timezone })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// UTC as `YYYY-MM-DDTHH:MM:SSZ`, local as RFC 3339 with numeric offset
    pub fn timestamps_at(&self, now: DateTime<Utc>) -> AuditTimestamps {
        AuditTimestamps {
            local: now.with_timezone(&self.timezone).to_rfc3339_opts(SecondsFormat::Secs, false),
            utc: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Create the log table if absent; safe to call before every write
    pub async fn ensure_table(&self, conn: &mut SqliteConnection) -> Result<(), DatabaseError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action TEXT,
                target_table TEXT,
                target_id INTEGER,
                timestamp_local TEXT,
                timestamp_utc TEXT,
                metadata TEXT
            )",
            quote_identifier(&self.table)
        );
        sqlx::query(&sql).execute(conn).await?;
        Ok(())
    }

    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        entry: NewLogEntry<'_>,
    ) -> Result<AuditTimestamps, DatabaseError> {
        self.ensure_table(&mut *conn).await?;

        let stamps = self.timestamps_at(Utc::now());
        let sql = format!(
            "INSERT INTO {} (action, target_table, target_id, timestamp_local, timestamp_utc, metadata) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            quote_identifier(&self.table)
        );
        sqlx::query(&sql)
            .bind(entry.action.as_str().to_string())
            .bind(entry.target_table.map(str::to_string))
            .bind(entry.target_id)
            .bind(stamps.local.clone())
            .bind(stamps.utc.clone())
            .bind(entry.metadata)
            .execute(conn)
            .await?;

        tracing::debug!(
            "Logged {} on {:?} id={:?} at {}",
            entry.action, entry.target_table, entry.target_id, stamps.utc
        );
        Ok(stamps)
    }

    /// Newest entries first
    pub async fn recent(
        &self,
        conn: &mut SqliteConnection,
        limit: i64,
    ) -> Result<Vec<OperationLogEntry>, DatabaseError> {
        self.ensure_table(&mut *conn).await?;

        let sql = format!(
            "SELECT id, action, target_table, target_id, timestamp_local, timestamp_utc, metadata \
             FROM {} ORDER BY id DESC LIMIT ?1",
            quote_identifier(&self.table)
        );
        let entries = sqlx::query_as::<_, OperationLogEntry>(&sql)
            .bind(limit.max(0))
            .fetch_all(conn)
            .await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stamps_use_the_configured_zone_not_the_host() {
        let logger = AuditLogger::new("operations", "Asia/Kolkata").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 18, 45, 0).unwrap();
        let stamps = logger.timestamps_at(now);
        assert_eq!(stamps.utc, "2024-03-01T18:45:00Z");
        assert_eq!(stamps.local, "2024-03-02T00:15:00+05:30");
    }

    #[test]
    fn utc_stamp_parses_back() {
        let logger = AuditLogger::new("operations", "UTC").unwrap();
        let stamps = logger.timestamps_at(Utc::now());
        let parsed = DateTime::parse_from_rfc3339(&stamps.utc).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert!(stamps.utc.ends_with('Z'));
    }

    #[test]
    fn rejects_unknown_zone_and_bad_table() {
        assert!(matches!(
            AuditLogger::new("operations", "Mars/Olympus"),
            Err(DatabaseError::InvalidTimezone(_))
        ));
        assert!(AuditLogger::new("ops log", "UTC").is_err());
    }

    #[test]
    fn builds_entries() {
        let entry = NewLogEntry::new(AuditAction::Update).target("polaris_products", 4).metadata("{}");
        assert_eq!(entry.target_table, Some("polaris_products"));
        assert_eq!(entry.target_id, Some(4));
        assert_eq!(entry.metadata.as_deref(), Some("{}"));
    }
}
