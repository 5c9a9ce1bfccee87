pub mod database;
pub mod settings;

pub use database::{DailyCompletionRate, Database, TypeCompletionStats};
pub use settings::SettingsStore;

use std::path::PathBuf;

/// Returns `~/.config/aitas[-dev]/` based on AITAS_ENV.
///
/// Set AITAS_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("AITAS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("aitas-dev")
    } else {
        base_dir.join("aitas")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
