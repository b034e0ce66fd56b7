pub mod audit;
pub mod loader;
pub mod models;
pub mod record;
pub mod repository;
pub mod service;
pub mod sql;
pub mod store;

pub use audit::{AuditLogger, AuditTimestamps, NewLogEntry, OperationLogEntry};
pub use loader::{CsvSource, CsvTable, LoadError, Loader};
pub use record::{Record, RecordError};
pub use repository::{Audited, RecordRepository};
pub use service::Backend;
pub use store::{DatabaseError, Store};
