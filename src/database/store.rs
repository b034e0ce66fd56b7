use std::path::Path;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::info;

use crate::config::StoreConfig;
use crate::database::record::RecordError;
use crate::filter::{Filter, FilterError};

/// Errors from the tabular store and everything layered on it
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid time zone: {0}")]
    InvalidTimezone(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Handle on the SQLite file holding the data table and the operations log.
///
/// Cloning is cheap. Each operation acquires its own connection from the pool
/// and gives it back when the connection is dropped.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    data_table: String,
    ops_table: String,
}

impl Store {
    pub async fn open(config: &StoreConfig) -> Result<Self, DatabaseError> {
        Filter::validate_table_name(&config.data_table)?;
        Filter::validate_table_name(&config.ops_table)?;

        let path = Path::new(&config.path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(opts)
            .await?;

        info!("Opened store {} (data={}, ops={})", path.display(), config.data_table, config.ops_table);

        Ok(Self {
            pool,
            data_table: config.data_table.clone(),
            ops_table: config.ops_table.clone(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn data_table(&self) -> &str {
        &self.data_table
    }

    pub fn ops_table(&self) -> &str {
        &self.ops_table
    }

    /// Scoped connection for a single logical operation
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, DatabaseError> {
        Ok(self.pool.acquire().await?)
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn table_exists(conn: &mut SqliteConnection, table_name: &str) -> Result<bool, DatabaseError> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
        )
        .bind(table_name)
        .fetch_optional(conn)
        .await?;
        Ok(found.is_some())
    }

    /// Column names of `table_name` in declaration order
    pub async fn table_columns(conn: &mut SqliteConnection, table_name: &str) -> Result<Vec<String>, DatabaseError> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
            .bind(table_name)
            .fetch_all(conn)
            .await?;
        Ok(names)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed store pool");
    }
}
