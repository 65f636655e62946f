//! Configuration loading.
//!
//! Settings come from an optional TOML file; a missing file means defaults.
//! The tool never writes configuration back.

mod settings;

pub use settings::{
    AnalysisSettings, ChromaSettings, OutputSettings, SelectionSettings, Settings,
};

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load settings from a TOML file.
pub fn load(path: &Path) -> ConfigResult<Settings> {
    let text = fs::read_to_string(path)?;
    let settings = toml::from_str(&text)?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Load settings from a TOML file, falling back to defaults when the file
/// does not exist. A file that exists but fails to parse is still an error.
pub fn load_or_default(path: &Path) -> ConfigResult<Settings> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    load(path)
}
