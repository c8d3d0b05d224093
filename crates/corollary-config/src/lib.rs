//! Configuration management for corollary.
//!
//! This crate handles loading `corollary.yaml` files, discovering them in the
//! filesystem, and providing typed access to configuration values.

pub mod config;
pub mod discovery;

pub use config::{ConfigError, CorollaryConfig, MavenConfig, load_config};
pub use discovery::{LoadedConfig, find_config_file, load_discovered};
