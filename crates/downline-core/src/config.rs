use std::path::Path;

use serde::Deserialize;

use crate::subject::RoleId;

/// Policy knobs injected into the engines at construction. Explicit on
/// purpose: tests and embedders supply their own instance instead of going
/// through process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    /// The top-level admin role. Tenants holding it are excluded from the
    /// root operator's accessible scope.
    pub admin_role: RoleId,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub policy: PolicyConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub admin_role: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            admin_role: "admin".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, String),

    #[error("failed to parse config: {0}")]
    ParseToml(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl CoreConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e.to_string()))?;
            toml::from_str::<CoreConfig>(&contents)
                .map_err(|e| ConfigError::ParseToml(e.to_string()))?
        } else {
            CoreConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(role) = std::env::var("DOWNLINE_ADMIN_ROLE") {
            self.policy.admin_role = role;
        }
        if let Ok(level) = std::env::var("DOWNLINE_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Ok(format) = std::env::var("DOWNLINE_LOG_FORMAT") {
            match format.as_str() {
                "json" => self.log.format = LogFormat::Json,
                "pretty" => self.log.format = LogFormat::Pretty,
                other => {
                    tracing::warn!(value = other, "unknown DOWNLINE_LOG_FORMAT, keeping default")
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.admin_role.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "policy.admin_role must not be empty".to_string(),
            ));
        }
        if self.log.level.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "log.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy {
            admin_role: RoleId::new(&self.policy.admin_role),
        }
    }
}
