//! Process-wide configuration, loaded once at startup.
//!
//! Sources are layered: built-in defaults, then an optional file, then
//! `PAYRECON_`-prefixed environment variables (`PAYRECON_GATEWAY__SECRET`).

use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayreconConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3500)),
            enable_cors: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    /// In-process gateway; sessions are issued locally.
    #[default]
    Simulated,
    /// Hosted gateway reached over HTTPS.
    Http,
}

/// Merchant secret shared with the gateway. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewaySecret(String);

impl GatewaySecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for GatewaySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GatewaySecret(**redacted**)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub mode: GatewayMode,
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
    #[serde(default)]
    pub key_id: String,
    #[serde(default)]
    pub secret: GatewaySecret,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Retries of a session-open that failed with `GatewayUnreachable`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Simulated,
            base_url: default_gateway_url(),
            key_id: String::new(),
            secret: GatewaySecret::default(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// How long a session may wait for its callback before it is swept to `Failed`.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: default_session_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl ReconciliationConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_gateway_url() -> String {
    "https://api.razorpay.com/v1".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    200
}

fn default_session_timeout() -> u64 {
    15 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PayreconConfig {
    /// Loads configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&PayreconConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PAYRECON")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Checks the settings the payment path cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.secret.is_empty() {
            return Err(PaymentError::ConfigError(
                "gateway.secret must be set (PAYRECON_GATEWAY__SECRET)".to_string(),
            ));
        }
        if self.gateway.mode == GatewayMode::Http && self.gateway.key_id.is_empty() {
            return Err(PaymentError::ConfigError(
                "gateway.key_id is required in http mode".to_string(),
            ));
        }
        if self.reconciliation.session_timeout_secs == 0
            || self.reconciliation.sweep_interval_secs == 0
        {
            return Err(PaymentError::ConfigError(
                "reconciliation intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
