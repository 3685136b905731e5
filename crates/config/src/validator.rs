//! Configuration validation.
//!
//! Validation produces a report rather than failing on the first problem, so
//! `settled validate` can print everything that needs fixing in one pass.

use crate::MasterConfig;
use bigdecimal::BigDecimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Service name is required")]
    MissingServiceName,

    #[error("Invalid version format: {0}. Must be in format X.Y.Z (e.g., 1.0.0)")]
    InvalidVersionFormat(String),

    #[error("Server port must not be 0")]
    InvalidServerPort,

    #[error("Invalid fee rate '{0}': must parse as a decimal")]
    InvalidFeeRate(String),

    #[error("Fee rate {0} is out of range: must be >= 0 and < 1")]
    FeeRateOutOfRange(String),

    #[error("worker_count must be at least 1")]
    ZeroWorkerCount,

    #[error("queue_capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("Reconciler interval_seconds must be positive when enabled")]
    ZeroReconcileInterval,

    #[error("Reconciler settling_timeout_seconds must be positive when enabled")]
    ZeroSettlingTimeout,

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

/// Outcome of validating a [`MasterConfig`].
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a loaded configuration, collecting all errors and warnings.
pub fn validate_config(config: &MasterConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.service.name.trim().is_empty() {
        report.errors.push(ValidationError::MissingServiceName);
    }
    if !is_semver_like(&config.service.version) {
        report
            .errors
            .push(ValidationError::InvalidVersionFormat(config.service.version.clone()));
    }

    if config.server.port == 0 {
        report.errors.push(ValidationError::InvalidServerPort);
    }

    let s = &config.settlement;
    match BigDecimal::from_str(&s.fee_rate) {
        Ok(rate) => {
            let zero = BigDecimal::from(0);
            let one = BigDecimal::from(1);
            if rate < zero || rate >= one {
                report
                    .errors
                    .push(ValidationError::FeeRateOutOfRange(s.fee_rate.clone()));
            } else if rate == zero {
                report.warnings.push(ValidationWarning {
                    field: "settlement.fee_rate".to_string(),
                    message: "fee rate is zero; trades settle without fees".to_string(),
                });
            }
        }
        Err(_) => {
            report
                .errors
                .push(ValidationError::InvalidFeeRate(s.fee_rate.clone()));
        }
    }

    if s.worker_count == 0 {
        report.errors.push(ValidationError::ZeroWorkerCount);
    } else if s.worker_count > 64 {
        report.warnings.push(ValidationWarning {
            field: "settlement.worker_count".to_string(),
            message: format!("{} workers is unusually high", s.worker_count),
        });
    }

    if s.queue_capacity == 0 {
        report.errors.push(ValidationError::ZeroQueueCapacity);
    }

    if s.reconciler.enabled {
        if s.reconciler.interval_seconds == 0 {
            report.errors.push(ValidationError::ZeroReconcileInterval);
        }
        if s.reconciler.settling_timeout_seconds == 0 {
            report.errors.push(ValidationError::ZeroSettlingTimeout);
        }
    } else {
        report.warnings.push(ValidationWarning {
            field: "settlement.reconciler.enabled".to_string(),
            message: "reconciler disabled; trades stuck in SETTLING are never recovered"
                .to_string(),
        });
    }

    let format_ok = matches!(
        config.logging.format.to_lowercase().as_str(),
        "pretty" | "json" | "compact"
    );
    if !format_ok {
        report
            .errors
            .push(ValidationError::InvalidLogFormat(config.logging.format.clone()));
    }

    report
}

fn is_semver_like(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
