//! Service configuration for the CodeTel simulator
//!
//! Configuration is environment-driven with sensible local defaults so the
//! simulator boots with no setup at all. Every knob can be overridden through
//! `CODETEL_*` environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// Static API key expected as the basic-auth username on every
    /// non-health endpoint
    pub api_key: String,
    /// Optional path to a seed document loaded at boot (JSON or YAML,
    /// decided by extension); falls back to the built-in medium-team preset
    pub seed_path: Option<String>,
    pub generation: GenerationDefaults,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
}

/// Defaults applied to the boot-time generation pass and to regeneration
/// requests that leave fields at zero
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationDefaults {
    /// Simulation window length in days
    pub days: u32,
    /// Qualitative event-rate setting: low / medium / high
    pub velocity: String,
    /// Hard cap on generated commits, 0 = unlimited
    pub max_commits: u64,
    /// Skip the boot-time generation pass entirely
    pub generate_on_start: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8200,
            request_timeout_seconds: 30,
        }
    }
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            days: 30,
            velocity: "medium".to_string(),
            max_commits: 0,
            generate_on_start: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api_key: "codetel-dev-key".to_string(),
            seed_path: None,
            generation: GenerationDefaults::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Self {
            server: ServerConfig {
                host: env::var("CODETEL_HOST").unwrap_or(defaults.server.host),
                port: env::var("CODETEL_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.server.port),
                request_timeout_seconds: env::var("CODETEL_REQUEST_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.server.request_timeout_seconds),
            },
            api_key: env::var("CODETEL_API_KEY").unwrap_or(defaults.api_key),
            seed_path: env::var("CODETEL_SEED_PATH").ok(),
            generation: GenerationDefaults {
                days: env::var("CODETEL_GENERATION_DAYS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.generation.days),
                velocity: env::var("CODETEL_GENERATION_VELOCITY")
                    .unwrap_or(defaults.generation.velocity),
                max_commits: env::var("CODETEL_GENERATION_MAX_COMMITS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.generation.max_commits),
                generate_on_start: env::var("CODETEL_GENERATE_ON_START")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.generation.generate_on_start),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = Config::default();
        assert_eq!(config.server.port, 8200);
        assert_eq!(config.generation.velocity, "medium");
        assert!(config.generation.generate_on_start);
    }
}
