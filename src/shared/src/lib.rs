//! Shared types and configuration for the CodeTel telemetry simulator

pub mod config;
pub mod types;

pub use config::{Config, GenerationDefaults, ServerConfig};
pub use types::*;
