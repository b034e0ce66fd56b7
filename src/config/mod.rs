use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub store: StoreConfig,
    pub filter: FilterConfig,
    pub audit: AuditConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the SQLite database file
    pub path: String,
    pub data_table: String,
    pub ops_table: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub default_limit: i64,
    pub max_limit: Option<i64>,
    pub debug_logging: bool,
}

/// What happens when the audit write fails after the data mutation succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditPolicy {
    /// Mutation and log entry share one transaction
    Strict,
    /// Mutation commits first; a failed log write is reported but not rolled back
    BestEffort,
}

impl AuditPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(AuditPolicy::Strict),
            "best_effort" | "best-effort" | "besteffort" => Some(AuditPolicy::BestEffort),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// IANA zone used for `timestamp_local`
    pub timezone: String,
    pub policy: AuditPolicy,
    pub history_limit: i64,
    /// Column whose value becomes the CREATE entry's metadata
    pub title_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    /// CSV loaded at startup when the file exists
    pub default_csv: Option<String>,
    pub enable_cors: bool,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Store overrides
        if let Ok(v) = env::var("POLARIS_DB_PATH") {
            self.store.path = v;
        }
        if let Ok(v) = env::var("POLARIS_DATA_TABLE") {
            self.store.data_table = v;
        }
        if let Ok(v) = env::var("POLARIS_OPS_TABLE") {
            self.store.ops_table = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.store.max_connections = v.parse().unwrap_or(self.store.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_BUSY_TIMEOUT_SECS") {
            self.store.busy_timeout_secs = v.parse().unwrap_or(self.store.busy_timeout_secs);
        }

        // Filter overrides
        if let Ok(v) = env::var("FILTER_DEFAULT_LIMIT") {
            self.filter.default_limit = v.parse().unwrap_or(self.filter.default_limit);
        }
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }

        // Audit overrides
        if let Ok(v) = env::var("POLARIS_TIMEZONE") {
            self.audit.timezone = v;
        }
        if let Ok(v) = env::var("AUDIT_POLICY") {
            self.audit.policy = AuditPolicy::parse(&v).unwrap_or(self.audit.policy);
        }
        if let Ok(v) = env::var("AUDIT_HISTORY_LIMIT") {
            self.audit.history_limit = v.parse().unwrap_or(self.audit.history_limit);
        }
        if let Ok(v) = env::var("POLARIS_TITLE_COLUMN") {
            self.audit.title_column = v;
        }

        // API overrides
        if let Some(port) = env::var("POLARIS_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("POLARIS_DEFAULT_CSV") {
            self.api.default_csv = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = env::var("API_ENABLE_CORS") {
            self.api.enable_cors = v.parse().unwrap_or(self.api.enable_cors);
        }
        if let Ok(v) = env::var("API_MAX_UPLOAD_BYTES") {
            self.api.max_upload_bytes = v.parse().unwrap_or(self.api.max_upload_bytes);
        }

        self
    }

    fn base_store() -> StoreConfig {
        StoreConfig {
            path: "polaris_data.db".to_string(),
            data_table: "polaris_products".to_string(),
            ops_table: "operations".to_string(),
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }

    fn base_audit() -> AuditConfig {
        AuditConfig {
            timezone: "Asia/Kolkata".to_string(),
            policy: AuditPolicy::BestEffort,
            history_limit: 200,
            title_column: "Title".to_string(),
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            store: Self::base_store(),
            filter: FilterConfig {
                default_limit: 1000,
                max_limit: Some(5000),
                debug_logging: true,
            },
            audit: Self::base_audit(),
            api: ApiConfig {
                port: 3000,
                default_csv: Some("polaris.csv".to_string()),
                enable_cors: true,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            store: StoreConfig {
                max_connections: 10,
                ..Self::base_store()
            },
            filter: FilterConfig {
                default_limit: 1000,
                max_limit: Some(2000),
                debug_logging: false,
            },
            audit: Self::base_audit(),
            api: ApiConfig {
                port: 3000,
                default_csv: Some("polaris.csv".to_string()),
                enable_cors: true,
                max_upload_bytes: 5 * 1024 * 1024, // 5MB
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            store: StoreConfig {
                max_connections: 10,
                busy_timeout_secs: 10,
                ..Self::base_store()
            },
            filter: FilterConfig {
                default_limit: 500,
                max_limit: Some(1000),
                debug_logging: false,
            },
            audit: AuditConfig {
                policy: AuditPolicy::Strict,
                ..Self::base_audit()
            },
            api: ApiConfig {
                port: 8080,
                default_csv: None,
                enable_cors: false,
                max_upload_bytes: 2 * 1024 * 1024, // 2MB
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.filter.default_limit, 1000);
        assert_eq!(config.store.data_table, "polaris_products");
        assert_eq!(config.store.ops_table, "operations");
        assert_eq!(config.audit.policy, AuditPolicy::BestEffort);
        assert_eq!(config.audit.timezone, "Asia/Kolkata");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.filter.default_limit, 500);
        assert_eq!(config.audit.policy, AuditPolicy::Strict);
        assert!(config.api.default_csv.is_none());
    }

    #[test]
    fn parses_audit_policy_names() {
        assert_eq!(AuditPolicy::parse("STRICT"), Some(AuditPolicy::Strict));
        assert_eq!(AuditPolicy::parse("best-effort"), Some(AuditPolicy::BestEffort));
        assert_eq!(AuditPolicy::parse("sometimes"), None);
    }
}
