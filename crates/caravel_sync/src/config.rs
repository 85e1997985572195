//! Session and retry configuration.

use crate::error::{SyncError, SyncResult};
use std::fmt;
use std::time::Duration;

/// Default port for sync endpoints.
pub const DEFAULT_PORT: u16 = 4984;

/// Transport scheme of a sync endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointScheme {
    /// Plain WebSocket.
    Ws,
    /// WebSocket over TLS.
    Wss,
}

impl fmt::Display for EndpointScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointScheme::Ws => f.write_str("ws"),
            EndpointScheme::Wss => f.write_str("wss"),
        }
    }
}

/// A remote sync endpoint. Immutable once a session is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEndpoint {
    /// Transport scheme.
    pub scheme: EndpointScheme,
    /// Remote host.
    pub host: String,
    /// Remote port.
    pub port: u16,
    /// Remote database name.
    pub database: String,
}

impl SyncEndpoint {
    /// Parses an endpoint from a URL like `ws://127.0.0.1:4984/db`.
    ///
    /// The port defaults to [`DEFAULT_PORT`] when omitted. Anything other
    /// than a `ws`/`wss` URL with a host and a database path is a
    /// configuration error.
    pub fn parse(url: &str) -> SyncResult<Self> {
        let (scheme, rest) = if let Some(rest) = url.strip_prefix("wss://") {
            (EndpointScheme::Wss, rest)
        } else if let Some(rest) = url.strip_prefix("ws://") {
            (EndpointScheme::Ws, rest)
        } else {
            return Err(SyncError::Configuration(format!(
                "endpoint `{url}` must use the ws:// or wss:// scheme"
            )));
        };

        let (authority, database) = match rest.split_once('/') {
            Some((authority, database)) if !database.is_empty() => (authority, database),
            _ => {
                return Err(SyncError::Configuration(format!(
                    "endpoint `{url}` is missing a database path"
                )))
            }
        };

        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    SyncError::Configuration(format!("endpoint `{url}` has an invalid port"))
                })?;
                (host, port)
            }
            None => (authority, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(SyncError::Configuration(format!(
                "endpoint `{url}` is missing a host"
            )));
        }

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            database: database.to_string(),
        })
    }
}

impl fmt::Display for SyncEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}/{}",
            self.scheme, self.host, self.port, self.database
        )
    }
}

/// A username/secret pair handed to the session at construction.
///
/// The secret is redacted from debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredential {
    username: String,
    secret: String,
}

impl AuthCredential {
    /// Creates a credential.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredential")
            .field("username", &self.username)
            .field("secret", &"*".repeat(self.secret.len()))
            .finish()
    }
}

/// Per-collection replication filters.
///
/// Empty allow-lists mean "replicate everything in that collection".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFilter {
    /// Collection name.
    pub collection: String,
    /// Document-id allow-list.
    pub document_ids: Vec<String>,
    /// Channel allow-list.
    pub channels: Vec<String>,
}

impl PartitionFilter {
    /// Creates a filter replicating everything in a collection.
    pub fn replicate_all(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            document_ids: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// Sets the document-id allow-list.
    pub fn with_document_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the channel allow-list.
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if neither allow-list is set.
    pub fn is_unfiltered(&self) -> bool {
        self.document_ids.is_empty() && self.channels.is_empty()
    }
}

/// Configuration for one sync session.
///
/// Immutable for the session's lifetime; changing collections or
/// continuity requires building a new session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote endpoint.
    pub endpoint: SyncEndpoint,
    /// Credential presented to the remote.
    pub credential: AuthCredential,
    /// Keep running after catching up instead of stopping.
    pub continuous: bool,
    /// Collections participating in sync, with their filters.
    pub collections: Vec<PartitionFilter>,
    /// Purge local documents when access to them is revoked remotely.
    pub auto_purge_on_access_loss: bool,
}

impl SessionConfig {
    /// Creates a one-shot session configuration with no collections.
    pub fn new(endpoint: SyncEndpoint, credential: AuthCredential) -> Self {
        Self {
            endpoint,
            credential,
            continuous: false,
            collections: Vec::new(),
            auto_purge_on_access_loss: true,
        }
    }

    /// Sets whether the session is continuous.
    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    /// Sets the participating collections.
    pub fn with_collections(mut self, collections: Vec<PartitionFilter>) -> Self {
        self.collections = collections;
        self
    }

    /// Sets the auto-purge behavior.
    pub fn with_auto_purge(mut self, auto_purge: bool) -> Self {
        self.auto_purge_on_access_loss = auto_purge;
        self
    }
}

/// Configuration for restart backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of restart attempts.
    pub max_attempts: u32,
    /// Initial delay between attempts.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculates the delay before a given attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter, derived from the clock rather than an RNG.
            let jitter = capped * 0.25 * clock_jitter();
            Duration::from_secs_f64(capped + jitter)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// What the coordinator does when a continuous session stops unexpectedly.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StopPolicy {
    /// Log an operator-visible alert and stay stopped.
    #[default]
    Halt,
    /// Restart the session with bounded backoff before giving up.
    Retry(RetryConfig),
}

fn clock_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
