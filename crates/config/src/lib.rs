//! Configuration for OpenSettle
//!
//! A single YAML master config drives the binary: server bind address,
//! settlement parameters (fee rate, worker pool size, queue capacity,
//! reconciliation sweep) and logging. Values may reference environment
//! variables with `${VAR}` placeholders, substituted at load time.

use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use parser::{generate_default_config, load_config, save_config};
pub use substitution::{has_unresolved_env_vars, substitute_env_vars};
pub use validator::{validate_config, ValidationError, ValidationReport, ValidationWarning};

use defaults::*;

/// Top-level configuration file layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MasterConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
        }
    }
}

/// Settlement pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettlementConfig {
    /// Fee rate applied to the quote amount at trade creation.
    /// Kept as a decimal string so it never round-trips through a float.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: String,
    /// Number of concurrent settlement workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Bound of the in-process settlement queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

/// Simulated chain client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// Artificial broadcast latency, mirroring a real RPC round trip.
    #[serde(default = "default_broadcast_delay_ms")]
    pub broadcast_delay_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            broadcast_delay_ms: default_broadcast_delay_ms(),
        }
    }
}

/// Reconciliation sweep for trades stuck in SETTLING.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcilerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How often the sweep runs.
    #[serde(default = "default_reconcile_interval_seconds")]
    pub interval_seconds: u64,
    /// How long a trade may sit in SETTLING before the sweep picks it up.
    #[serde(default = "default_settling_timeout_seconds")]
    pub settling_timeout_seconds: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_seconds: default_reconcile_interval_seconds(),
            settling_timeout_seconds: default_settling_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// One of: pretty, json, compact.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}
