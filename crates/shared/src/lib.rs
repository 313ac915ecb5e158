//! Shared settings, errors, and configuration for Cirrus.
//!
//! This crate provides the pieces every other crate needs:
//! - Object-storage site settings and their validation
//! - Settings error types
//! - Configuration loading from files and environment
//! - Tracing subscriber initialization

pub mod config;
pub mod error;
pub mod settings;
pub mod telemetry;

pub use config::{AppConfig, ListingConfig};
pub use error::{SettingsError, SettingsResult};
pub use settings::{BackendKind, StorageSettings};
