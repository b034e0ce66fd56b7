use crate::config::AppConfig;
use crate::database::audit::{AuditLogger, OperationLogEntry};
use crate::database::loader::Loader;
use crate::database::repository::RecordRepository;
use crate::database::store::{DatabaseError, Store};

/// Everything the presentation layers call, wired from one config.
#[derive(Debug, Clone)]
pub struct Backend {
    store: Store,
    audit: AuditLogger,
    loader: Loader,
    records: RecordRepository,
    history_limit: i64,
}

impl Backend {
    /// Open the store file and make sure the operations log exists
    pub async fn open(config: &AppConfig) -> Result<Self, DatabaseError> {
        let store = Store::open(&config.store).await?;
        Self::from_store(store, config).await
    }

    pub async fn from_store(store: Store, config: &AppConfig) -> Result<Self, DatabaseError> {
        let audit = AuditLogger::new(store.ops_table(), &config.audit.timezone)?;
        {
            let mut conn = store.acquire().await?;
            audit.ensure_table(&mut conn).await?;
        }

        Ok(Self {
            loader: Loader::new(store.clone(), audit.clone()),
            records: RecordRepository::new(store.clone(), audit.clone(), &config.filter, &config.audit),
            history_limit: config.audit.history_limit,
            store,
            audit,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn records(&self) -> &RecordRepository {
        &self.records
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Newest log entries, `history_limit` when no limit is given
    pub async fn operations(&self, limit: Option<i64>) -> Result<Vec<OperationLogEntry>, DatabaseError> {
        let mut conn = self.store.acquire().await?;
        self.audit.recent(&mut conn, limit.unwrap_or(self.history_limit)).await
    }
}
