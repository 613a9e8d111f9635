//! Multi-environment configuration and credential brokering for an MCP
//! server fronting named SQL-warehouse endpoints.
//!
//! The core is [`manager::EnvironmentManager`]: it resolves configuration
//! from a structured YAML file (or a legacy `.env` fallback), holds the
//! active environment, and supports atomic runtime switching and hot-reload.
//! [`handler::EnvironmentServerHandler`] exposes the thin MCP tool surface
//! over it.

pub mod config;
pub mod error;
pub mod handler;
pub mod loader;
pub mod manager;
pub mod model;
pub mod watcher;
