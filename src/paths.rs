//! Common paths for fitcheck data storage
//!
//! All data is stored under ~/.config/fitcheck/ on all platforms:
//! - config.toml - User configuration
//! - fitcheck.sqlite - Local database (current session)

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the data directory (~/.config/fitcheck/)
pub fn data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("fitcheck");
    fs::create_dir_all(&dir).context("Failed to create fitcheck directory")?;
    Ok(dir)
}

/// Get the config file path (~/.config/fitcheck/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("config.toml"))
}

/// Get the database file path (~/.config/fitcheck/fitcheck.sqlite)
pub fn database_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("fitcheck.sqlite"))
}
