//! Config file loading, saving and default generation.

use crate::substitution;
use crate::{
    ChainConfig, LoggingConfig, MasterConfig, ReconcilerConfig, ServerConfig, ServiceConfig,
    SettlementConfig,
};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MasterConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let substituted = substitution::substitute_env_vars(&content)?;
    debug!("Environment variable substitution completed");

    let config: MasterConfig =
        serde_yaml::from_str(&substituted).with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &MasterConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    let yaml = serde_yaml::to_string(config).with_context(|| "Failed to serialize configuration")?;
    fs::write(path, yaml).with_context(|| format!("Failed to write config file: {:?}", path))?;
    info!("Configuration saved to: {:?}", path);
    Ok(())
}

/// Build the default configuration written by `settled init`.
pub fn generate_default_config() -> MasterConfig {
    MasterConfig {
        service: ServiceConfig {
            name: "opensettle".to_string(),
            version: "1.0.0".to_string(),
        },
        server: ServerConfig::default(),
        settlement: SettlementConfig {
            fee_rate: crate::defaults::default_fee_rate(),
            worker_count: crate::defaults::default_worker_count(),
            queue_capacity: crate::defaults::default_queue_capacity(),
            chain: ChainConfig::default(),
            reconciler: ReconcilerConfig::default(),
        },
        logging: LoggingConfig::default(),
    }
}
