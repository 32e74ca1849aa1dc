//! CodeTel Simulator
//!
//! High-fidelity simulator of an AI-coding-assistant telemetry and
//! source-hosting back end. A declarative seed document drives a
//! deterministic generation pipeline that fills an in-memory corpus of
//! commits, pull requests, reviews, issues and feature-event streams; the
//! corpus is served over two HTTP wire families (camelCase analytics,
//! snake_case source-host) plus an admin control plane and a research
//! surface.

pub mod admin;
pub mod auth;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod query;
pub mod sampling;
pub mod seed_loader;
pub mod server;
pub mod state;
pub mod store;

pub use error::{Result, SimulatorError};
pub use state::AppState;
