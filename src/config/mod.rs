/// Database configuration and connection management
pub mod database;

/// Service settings loaded from config.toml and the environment
pub mod settings;

pub use settings::{AppConfig, load_app_config};
