//! Configuration management
//!
//! Handles loading connection profiles and harness settings.

pub mod connections;
pub mod settings;

pub use connections::{ConnectionConfig, SslMode, find_connection, load_connections};
pub use settings::{Settings, load_settings};
