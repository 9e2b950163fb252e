mod dispatch;
mod observability;
mod planner;
mod resolver;
mod server;
mod staffing;

pub use dispatch::*;
pub use observability::*;
pub use planner::*;
pub use resolver::*;
pub use server::*;
pub use staffing::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub staffing: StaffingConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.frame_buffer == 0 {
            errors.push(ConfigError::error(
                "server.frame_buffer",
                "frame_buffer must be at least 1",
            ));
        }

        if self.auth.expected_issuer.is_empty() {
            errors.push(ConfigError::error(
                "auth.expected_issuer",
                "expected_issuer must not be empty",
            ));
        }

        if self.staffing.base_url.is_empty() {
            errors.push(ConfigError::error(
                "staffing.base_url",
                "base_url must not be empty",
            ));
        } else if !self.staffing.base_url.starts_with("http://")
            && !self.staffing.base_url.starts_with("https://")
        {
            errors.push(ConfigError::error(
                "staffing.base_url",
                "base_url must start with http:// or https://",
            ));
        }
        if self.staffing.max_attempts == 0 {
            errors.push(ConfigError::error(
                "staffing.max_attempts",
                "max_attempts must be at least 1",
            ));
        }

        if self.pool.max_concurrent == 0 {
            errors.push(ConfigError::error(
                "pool.max_concurrent",
                "max_concurrent must be at least 1",
            ));
        }

        if self.dispatch.history_exchanges == 0 {
            errors.push(ConfigError::warning(
                "dispatch.history_exchanges",
                "0 disables conversation memory entirely",
            ));
        }
        if self.dispatch.snapshot_capacity == 0 {
            errors.push(ConfigError::warning(
                "dispatch.snapshot_capacity",
                "0 disables tool-result snapshots",
            ));
        }
        if self.dispatch.timezone.parse::<chrono_tz::Tz>().is_err() {
            errors.push(ConfigError::error(
                "dispatch.timezone",
                format!("unknown timezone {:?}", self.dispatch.timezone),
            ));
        }

        if !(0.0..=1.0).contains(&self.resolver.threshold) {
            errors.push(ConfigError::error(
                "resolver.threshold",
                "threshold must be within 0.0..=1.0",
            ));
        }
        if self.resolver.num_perm < 2 {
            errors.push(ConfigError::error(
                "resolver.num_perm",
                "num_perm must be at least 2",
            ));
        }
        if self.resolver.shingle_size == 0 {
            errors.push(ConfigError::error(
                "resolver.shingle_size",
                "shingle_size must be at least 1",
            ));
        }

        if self.planner.max_tool_loops == 0 {
            errors.push(ConfigError::error(
                "planner.max_tool_loops",
                "max_tool_loops must be at least 1",
            ));
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                "sample_rate must be within 0.0..=1.0",
            ));
        }

        // CORS: warn if wildcard is used.
        if self.server.cors.allows_any_origin() {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }
}
