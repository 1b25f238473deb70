//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use promptsmith_core::{PlanLimits, PlanTier};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which collaborator turns user input into a prompt payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationBackend {
    /// Call the OpenAI chat completion API directly.
    OpenAi { api_key: String, model: String },
    /// Forward to an HTTP endpoint that returns the payload JSON.
    Relay { url: String },
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub data_dir: PathBuf,
    pub backend: GenerationBackend,
    pub limits: PlanLimits,
    pub default_plan: PlanTier,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_dir = var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let cors_origin =
            var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        // --- Generation Collaborator ---
        let backend_name = var("GENERATION_BACKEND").unwrap_or_else(|| "openai".to_string());
        let backend = match backend_name.trim().to_lowercase().as_str() {
            "openai" => GenerationBackend::OpenAi {
                api_key: var("OPENAI_API_KEY")
                    .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?,
                model: var("GENERATION_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            },
            "relay" => GenerationBackend::Relay {
                url: var("RELAY_URL")
                    .ok_or_else(|| ConfigError::MissingVar("RELAY_URL".to_string()))?,
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "GENERATION_BACKEND".to_string(),
                    format!("'{}' is not one of openai, relay", other),
                ))
            }
        };

        // --- Plan Settings ---
        let defaults = PlanLimits::default();
        let limits = PlanLimits {
            daily_limit: parse_or(&var, "FREE_DAILY_LIMIT", defaults.daily_limit)?,
            history_limit: parse_or(&var, "FREE_HISTORY_LIMIT", defaults.history_limit)?,
        };

        let default_plan = match var("DEFAULT_PLAN") {
            Some(raw) => raw
                .parse::<PlanTier>()
                .map_err(|e| ConfigError::InvalidValue("DEFAULT_PLAN".to_string(), e))?,
            None => PlanTier::Free,
        };

        Ok(Self {
            bind_address,
            log_level,
            data_dir,
            backend,
            limits,
            default_plan,
            cors_origin,
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_with_only_the_api_key() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.limits, PlanLimits::default());
        assert_eq!(config.default_plan, PlanTier::Free);
        assert_eq!(
            config.backend,
            GenerationBackend::OpenAi {
                api_key: "sk-test".to_string(),
                model: "gpt-4o-mini".to_string()
            }
        );
    }

    #[test]
    fn openai_backend_requires_a_key() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "OPENAI_API_KEY"));
    }

    #[test]
    fn relay_backend_requires_a_url() {
        let err = Config::from_lookup(lookup(&[("GENERATION_BACKEND", "relay")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "RELAY_URL"));

        let config = Config::from_lookup(lookup(&[
            ("GENERATION_BACKEND", "Relay"),
            ("RELAY_URL", "http://localhost:8787/generate"),
        ]))
        .unwrap();
        assert_eq!(
            config.backend,
            GenerationBackend::Relay {
                url: "http://localhost:8787/generate".to_string()
            }
        );
    }

    #[test]
    fn limits_and_plan_can_be_overridden() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("FREE_DAILY_LIMIT", "3"),
            ("FREE_HISTORY_LIMIT", "20"),
            ("DEFAULT_PLAN", "pro"),
        ]))
        .unwrap();
        assert_eq!(config.limits.daily_limit, 3);
        assert_eq!(config.limits.history_limit, 20);
        assert_eq!(config.default_plan, PlanTier::Pro);
    }

    #[test]
    fn invalid_values_are_reported_by_name() {
        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("FREE_DAILY_LIMIT", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == "FREE_DAILY_LIMIT"));

        let err = Config::from_lookup(lookup(&[("GENERATION_BACKEND", "carrier-pigeon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == "GENERATION_BACKEND"));
    }
}
