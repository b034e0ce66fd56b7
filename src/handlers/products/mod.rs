pub mod collection;
pub mod record;

// Re-export handler functions for use in routing
pub use collection::find as products_find;
pub use collection::get as products_get;
pub use collection::post as products_post;

pub use record::delete as record_delete;
pub use record::get as record_get;
pub use record::put as record_put;

use serde::Serialize;

use crate::database::AuditTimestamps;

/// Body returned by create / update / delete
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub id: i64,
    pub logged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_utc: Option<String>,
}

impl MutationResponse {
    pub fn new(id: i64, audit: Option<AuditTimestamps>) -> Self {
        let logged = audit.is_some();
        let (timestamp_local, timestamp_utc) = match audit {
            Some(AuditTimestamps { local, utc }) => (Some(local), Some(utc)),
            None => (None, None),
        };
        Self { id, logged, timestamp_local, timestamp_utc }
    }
}
