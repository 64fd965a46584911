use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Error, Result};
use crate::model::Issuer;

const DEFAULT_SENDER_TEMPLATE: &str = include_str!("../sender.toml");
const SENDER_FILE: &str = "sender.toml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// GST rate pre-filled on new rows.
    #[serde(default = "default_gst_percent")]
    pub default_gst_percent: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_data_root() -> String {
    "~/Documents/Invoices".to_string()
}

fn default_gst_percent() -> f64 {
    18.0
}

fn default_currency() -> String {
    "INR".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            default_gst_percent: default_gst_percent(),
            currency: default_currency(),
        }
    }
}

impl AppSettings {
    /// `data_root` with `~` expanded.
    pub fn root(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.data_root))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("output")
    }
}

pub fn config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "gst-invoice", "app") {
        return proj_dirs.config_dir().join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

/// Read settings from `path`. `Ok(None)` when the file does not exist yet.
pub fn load_settings_from(path: &Path) -> Result<Option<AppSettings>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let settings = toml::from_str(&content)
        .map_err(|source| Error::TomlDecode { path: path.to_path_buf(), source })?;
    Ok(Some(settings))
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let toml_str = toml::to_string_pretty(settings)?;
    fs::write(path, toml_str).map_err(|e| Error::io(path, e))?;
    info!(path = %path.display(), "settings saved");
    Ok(())
}

pub fn load_settings() -> Result<Option<AppSettings>> {
    load_settings_from(&config_path())
}

pub fn save_settings(settings: &AppSettings) -> Result<()> {
    save_settings_to(&config_path(), settings)
}

/// Issuer block from `<root>/sender.toml`, seeding the file from the bundled
/// default on first use.
pub fn load_issuer(root: &Path) -> Result<Issuer> {
    let path = root.join(SENDER_FILE);
    if path.exists() {
        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        return toml::from_str(&content).map_err(|source| Error::TomlDecode { path, source });
    }

    println!("✨ Initializing default sender configuration...");
    let issuer: Issuer = toml::from_str(DEFAULT_SENDER_TEMPLATE)
        .map_err(|source| Error::TomlDecode { path: PathBuf::from(SENDER_FILE), source })?;
    fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
    fs::write(&path, DEFAULT_SENDER_TEMPLATE).map_err(|e| Error::io(&path, e))?;
    Ok(issuer)
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: AppSettings = toml::from_str(r#"data_root = "/tmp/inv""#).unwrap();
        assert_eq!(settings.data_root, "/tmp/inv");
        assert_eq!(settings.default_gst_percent, 18.0);
        assert_eq!(settings.currency, "INR");
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        assert!(load_settings_from(&path).unwrap().is_none());

        let settings = AppSettings { default_gst_percent: 5.0, ..AppSettings::default() };
        save_settings_to(&path, &settings).unwrap();
        assert_eq!(load_settings_from(&path).unwrap(), Some(settings));
    }

    #[test]
    fn bundled_sender_parses_and_is_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = load_issuer(dir.path()).unwrap();
        assert!(!issuer.name.is_empty());
        assert!(dir.path().join(SENDER_FILE).exists());
        assert_eq!(load_issuer(dir.path()).unwrap(), issuer);
    }

    #[test]
    fn plain_paths_are_not_expanded() {
        assert_eq!(expand_home_dir("/var/data"), "/var/data");
    }
}
