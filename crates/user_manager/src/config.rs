use crate::domain::UserManagerServiceConfig;
use common::telemetry::TelemetryConfig;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UserManagerConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Service name attached to telemetry
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Deadline for each call to the access, directory and role services
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    /// Maximum concurrent per-user calls when building ownership views
    #[serde(default = "default_population_concurrency")]
    pub population_concurrency: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "user-manager".to_string()
}

fn default_upstream_timeout_ms() -> u64 {
    5000
}

fn default_population_concurrency() -> usize {
    8
}

impl UserManagerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("USER_MANAGER"))
            .build()?
            .try_deserialize()
    }

    pub fn service_config(&self) -> UserManagerServiceConfig {
        UserManagerServiceConfig {
            upstream_timeout: Duration::from_millis(self.upstream_timeout_ms),
            population_concurrency: self.population_concurrency.max(1),
        }
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.service_name.clone(),
            log_level: self.log_level.clone(),
        }
    }
}
