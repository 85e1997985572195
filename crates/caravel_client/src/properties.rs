//! Properties-file driven configuration.
//!
//! The client is configured from a TOML properties file. Every section
//! and key has a default, so an empty file (or no file at all) yields a
//! runnable local demo configuration.

use crate::error::{ClientError, ClientResult};
use caravel_store::StoreConfig;
use caravel_sync::{
    AuthCredential, PartitionFilter, RetryConfig, SessionConfig, StopPolicy, SyncEndpoint,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default remote endpoint URL.
pub const DEFAULT_ENDPOINT_URL: &str = "ws://127.0.0.1:4984/db";

/// Top-level client properties.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Properties {
    /// Remote replication settings.
    #[serde(default)]
    pub remote: RemoteProperties,
    /// Local store settings.
    #[serde(default)]
    pub local: LocalProperties,
    /// Log settings.
    #[serde(default)]
    pub log: LogProperties,
}

/// Remote replication settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RemoteProperties {
    /// Endpoint URL, `ws://host:port/db`.
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    /// Keep the session running after it catches up.
    #[serde(default)]
    pub continuous: bool,
    /// Restart a continuous session that stops unexpectedly.
    #[serde(default)]
    pub restart_on_unexpected_stop: bool,
    /// Restart attempts before giving up.
    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: u32,
    /// Purge local documents when remote access to them is revoked.
    #[serde(default = "default_true")]
    pub auto_purge: bool,
    /// Per-collection replication filters.
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionFilterProperties>,
    /// Credential presented to the remote.
    #[serde(default)]
    pub authenticator: AuthenticatorProperties,
}

impl Default for RemoteProperties {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            continuous: false,
            restart_on_unexpected_stop: false,
            max_restart_attempts: default_max_restart_attempts(),
            auto_purge: true,
            collections: BTreeMap::new(),
            authenticator: AuthenticatorProperties::default(),
        }
    }
}

/// Per-collection filter settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CollectionFilterProperties {
    /// Channel allow-list.
    #[serde(default)]
    pub channels_filter: Vec<String>,
    /// Document-id allow-list.
    #[serde(default)]
    pub document_ids_filter: Vec<String>,
}

/// Credential settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AuthenticatorProperties {
    /// Username.
    #[serde(default = "default_username")]
    pub username: String,
    /// Password.
    #[serde(default = "default_password")]
    pub password: String,
}

impl Default for AuthenticatorProperties {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
        }
    }
}

/// Local store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LocalProperties {
    /// Store name.
    #[serde(default = "default_database")]
    pub database: String,
    /// Base directory for per-user store data.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Scope holding the client's collections.
    #[serde(default)]
    pub scope: ScopeProperties,
    /// Delete the previous store directory on startup.
    #[serde(default = "default_true")]
    pub flush_previous_db: bool,
}

impl Default for LocalProperties {
    fn default() -> Self {
        Self {
            database: default_database(),
            db_path: default_db_path(),
            scope: ScopeProperties::default(),
            flush_previous_db: true,
        }
    }
}

/// Scope settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScopeProperties {
    /// Scope name.
    #[serde(default = "default_scope_name")]
    pub name: String,
    /// Collections created in the scope at startup.
    #[serde(default = "default_scope_collections")]
    pub collections: Vec<String>,
}

impl Default for ScopeProperties {
    fn default() -> Self {
        Self {
            name: default_scope_name(),
            collections: default_scope_collections(),
        }
    }
}

/// Log settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LogProperties {
    /// Base directory for per-user log files.
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
    /// Log level when `--verbose` is not given.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write a plain-text log file.
    #[serde(default = "default_true")]
    pub file_enabled: bool,
    /// Delete previous log files on startup.
    #[serde(default)]
    pub flush_previous: bool,
}

impl Default for LogProperties {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            level: default_log_level(),
            file_enabled: true,
            flush_previous: false,
        }
    }
}

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}

fn default_max_restart_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_username() -> String {
    "test".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_database() -> String {
    "demo".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_scope_name() -> String {
    "_default".to_string()
}

fn default_scope_collections() -> Vec<String> {
    vec!["_default".to_string()]
}

fn default_log_path() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Properties {
    /// Loads properties from a TOML file.
    pub fn load(path: &Path) -> ClientResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Store configuration: the data directory is per-user.
    pub fn store_config(&self) -> StoreConfig {
        let directory = self
            .local
            .db_path
            .join(&self.remote.authenticator.username);
        StoreConfig::new(&self.local.database, directory)
            .with_flush_previous(self.local.flush_previous_db)
    }

    /// The replication filters the properties request.
    pub fn partition_filters(&self) -> Vec<PartitionFilter> {
        self.remote
            .collections
            .iter()
            .map(|(name, filter)| {
                PartitionFilter::replicate_all(name)
                    .with_channels(filter.channels_filter.iter().cloned())
                    .with_document_ids(filter.document_ids_filter.iter().cloned())
            })
            .collect()
    }

    /// Session configuration, without resolved collections.
    pub fn session_config(&self) -> ClientResult<SessionConfig> {
        let endpoint = SyncEndpoint::parse(&self.remote.endpoint_url)?;
        let credential = AuthCredential::new(
            &self.remote.authenticator.username,
            &self.remote.authenticator.password,
        );
        Ok(SessionConfig::new(endpoint, credential)
            .with_continuous(self.remote.continuous)
            .with_auto_purge(self.remote.auto_purge))
    }

    /// The unexpected-stop policy the properties select.
    pub fn stop_policy(&self) -> StopPolicy {
        if self.remote.restart_on_unexpected_stop {
            StopPolicy::Retry(RetryConfig::new(self.remote.max_restart_attempts))
        } else {
            StopPolicy::Halt
        }
    }

    /// Log directory: per-user, like the data directory.
    pub fn log_dir(&self) -> PathBuf {
        self.log.path.join(&self.remote.authenticator.username)
    }

    /// The collections created in the scope at startup.
    ///
    /// An empty list falls back to the `_default` collection so the
    /// client always has somewhere to write.
    pub fn scope_collections(&self) -> Vec<String> {
        if self.local.scope.collections.is_empty() {
            default_scope_collections()
        } else {
            self.local.scope.collections.clone()
        }
    }

    /// Validates cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ClientResult<()> {
        if self.remote.authenticator.username.is_empty() {
            return Err(ClientError::Config(
                "remote.authenticator.username must not be empty".into(),
            ));
        }
        if self.local.scope.name.is_empty() {
            return Err(ClientError::Config(
                "local.scope.name must not be empty".into(),
            ));
        }
        // Surface a bad endpoint at startup rather than at session build.
        SyncEndpoint::parse(&self.remote.endpoint_url)?;
        Ok(())
    }
}
