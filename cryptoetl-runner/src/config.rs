//! Pipeline configuration loaded from TOML.
//!
//! ```toml
//! [extract]
//! market = "USD"
//! symbols = ["BTC", "ETH"]
//!
//! [database]
//! host = "localhost"
//! dbname = "airflow"
//! ```
//!
//! Secrets (API key, database password) are never read from the file; the
//! caller attaches them after loading.

use cryptoetl_core::config::{ApiKey, ConfigError, ExtractConfig};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Database password. Never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DbPassword(String);

impl DbPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }
}

impl fmt::Debug for DbPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DbPassword(***)")
    }
}

/// Connection parameters for the PostgreSQL store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,

    /// How long to wait for the connection before failing the run.
    pub connect_timeout_secs: u64,

    #[serde(skip)]
    pub password: Option<DbPassword>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "airflow".to_string(),
            user: "airflow".to_string(),
            connect_timeout_secs: 10,
            password: None,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.dbname)
            .username(&self.user)
            .application_name("cryptoetl");
        match &self.password {
            Some(password) => options.password(&password.0),
            None => options,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Zero {
                field: "database.port",
            });
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Zero {
                field: "database.connect_timeout_secs",
            });
        }
        for (field, value) in [
            ("database.host", &self.host),
            ("database.dbname", &self.dbname),
            ("database.user", &self.user),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Blank { field });
            }
        }
        Ok(())
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub extract: ExtractConfig,
    pub database: DatabaseConfig,
}

impl PipelineConfig {
    /// Load a pipeline config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a pipeline config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.extract.api_key = api_key;
        self
    }

    pub fn with_db_password(mut self, password: DbPassword) -> Self {
        self.database.password = Some(password);
        self
    }

    /// Settings needed by the extract stage, including the API key.
    pub fn validate_for_extract(&self) -> Result<(), ConfigError> {
        self.extract.validate()
    }

    /// Settings needed by the load stage.
    pub fn validate_for_load(&self) -> Result<(), ConfigError> {
        self.database.validate()
    }
}
