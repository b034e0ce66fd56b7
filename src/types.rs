//! Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutating action recorded in the operations log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    /// Free-text action (trigger-style entries written by other tools)
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Other(text) => text,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an update or delete that addressed a row by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    Applied,
    NotFound,
}

impl MutationOutcome {
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows == 0 {
            MutationOutcome::NotFound
        } else {
            MutationOutcome::Applied
        }
    }
}
