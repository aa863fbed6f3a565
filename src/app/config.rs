use std::path::{Path, PathBuf};

use super::error::{MapError, Result};
use super::models::Settings;

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "MIND_MAP_CONFIG";
const CONFIG_FILE: &str = "settings.json";

/// `$MIND_MAP_CONFIG`, else `settings.json` in the platform config dir.
pub fn config_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    directories::ProjectDirs::from("", "", "mind-map")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .ok_or(MapError::NoConfigDir)
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults; fields
    /// absent from the file keep their default values.
    pub fn load(path: &Path) -> Result<Settings> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(source) => return Err(MapError::Read { path: path.to_owned(), source }),
        };
        let settings = serde_json::from_str(&text)?;
        tracing::info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|source| MapError::Write { path: dir.to_owned(), source })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|source| MapError::Write { path: path.to_owned(), source })?;
        tracing::info!(path = %path.display(), "saved settings");
        Ok(())
    }
}
