use crate::edm::EdmLocator;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-project directory holding environment scratch space
pub const DEFAULT_WORK_DIR: &str = ".tox-edm";

/// Keys accepted by `get`/`set`
pub const CONFIG_KEYS: [&str; 2] = ["edm-path", "work-dir"];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edm_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
}

impl Config {
    pub fn path() -> PathBuf {
        // Explicit override for tests and isolated runs
        if let Ok(env_path) = std::env::var("TOX_EDM_CONFIG") {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        #[cfg(not(target_os = "windows"))]
        let base = dirs::home_dir().map(|home| home.join(".config"));

        #[cfg(target_os = "windows")]
        let base = dirs::config_dir();

        base.unwrap_or_else(|| PathBuf::from("."))
            .join("tox-edm")
            .join("tox-edm.toml")
    }

    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "edm-path" => self.edm_path.clone(),
            "work-dir" => self.work_dir.clone(),
            _ => None,
        }
    }

    /// Set a known key; returns false for unknown keys.
    pub fn set(&mut self, key: &str, value: String) -> bool {
        match key {
            "edm-path" => self.edm_path = Some(value),
            "work-dir" => self.work_dir = Some(value),
            _ => return false,
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.edm_path.is_none() && self.work_dir.is_none()
    }

    pub fn values_iter(&self) -> Vec<(&str, String)> {
        let mut values = Vec::new();
        if let Some(ref val) = self.edm_path {
            values.push(("edm-path", val.clone()));
        }
        if let Some(ref val) = self.work_dir {
            values.push(("work-dir", val.clone()));
        }
        values
    }

    /// Locator honoring the configured edm path
    pub fn edm_locator(&self) -> EdmLocator {
        EdmLocator::new(self.edm_path.as_ref().map(PathBuf::from))
    }

    /// Environment scratch directory for a project rooted at `root`
    pub fn work_dir_for(&self, root: &Path) -> PathBuf {
        match self.work_dir {
            Some(ref dir) => root.join(dir),
            None => root.join(DEFAULT_WORK_DIR),
        }
    }
}
