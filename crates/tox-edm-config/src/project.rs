//! The `tox-edm.toml` environment definition file
//!
//! ```toml
//! [env.py38]
//! basepython = "python3.8"
//! deps = ["numpy", "pandas==1.0"]
//! commands = [["-failok"], ["pytest", "-q"]]
//! changedir = "tests"
//! setenv = { PYTHONHASHSEED = "0" }
//! ignore_errors = false
//! ignore_outcome = false
//! ```
//!
//! Environments keep the order they are declared in.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the project file, looked up in the working directory
pub const PROJECT_FILE_NAME: &str = "tox-edm.toml";

/// Error type for loading the project file
#[derive(Debug)]
pub enum ProjectError {
    /// The project file does not exist
    NotFound(PathBuf),
    /// The project file could not be read
    Read(PathBuf, std::io::Error),
    /// The project file is not valid TOML
    Parse(String),
    /// An `[env.<name>]` table has an invalid shape
    InvalidEnv { name: String, message: String },
    /// The requested environment is not defined
    UnknownEnv(String),
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::NotFound(path) => {
                write!(f, "Project file not found: {}", path.display())
            }
            ProjectError::Read(path, e) => {
                write!(f, "Failed to read {}: {}", path.display(), e)
            }
            ProjectError::Parse(msg) => write!(f, "Failed to parse project file: {}", msg),
            ProjectError::InvalidEnv { name, message } => {
                write!(f, "Invalid environment '{}': {}", name, message)
            }
            ProjectError::UnknownEnv(name) => {
                write!(f, "Environment '{}' is not defined in {}", name, PROJECT_FILE_NAME)
            }
        }
    }
}

impl std::error::Error for ProjectError {}

/// One `[env.<name>]` table
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EnvSection {
    pub basepython: Option<String>,
    pub deps: Vec<String>,
    pub commands: Vec<Vec<String>>,
    pub changedir: Option<PathBuf>,
    pub setenv: BTreeMap<String, String>,
    pub recreate: bool,
    pub ignore_errors: bool,
    pub ignore_outcome: bool,
}

impl EnvSection {
    /// Interpreter name for an environment: the explicit `basepython`, or one
    /// derived from a factor like `py38` → `python3.8` (`py38-django` works too).
    pub fn basepython_for(&self, env_name: &str) -> Option<String> {
        if let Some(ref basepython) = self.basepython {
            return Some(basepython.clone());
        }
        env_name.split('-').find_map(python_factor)
    }
}

fn python_factor(factor: &str) -> Option<String> {
    let digits = factor.strip_prefix("py")?;
    let mut chars = digits.chars();
    let major = chars.next().filter(char::is_ascii_digit)?;
    let minor: String = chars.collect();
    if minor.is_empty() || !minor.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("python{}.{}", major, minor))
}

/// A parsed project file
#[derive(Debug, Clone)]
pub struct ProjectFile {
    root: PathBuf,
    envs: Vec<(String, EnvSection)>,
}

impl ProjectFile {
    /// Load and parse the project file at `path`.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        if !path.is_file() {
            return Err(ProjectError::NotFound(path.to_path_buf()));
        }
        let content =
            fs::read_to_string(path).map_err(|e| ProjectError::Read(path.to_path_buf(), e))?;
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&content, root)
    }

    /// Parse project file contents; relative paths resolve against `root`.
    pub fn parse(content: &str, root: PathBuf) -> Result<Self, ProjectError> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| ProjectError::Parse(e.to_string()))?;

        let mut envs = Vec::new();
        if let Some(value) = table.get("env") {
            let env_table = value
                .as_table()
                .ok_or_else(|| ProjectError::Parse("`env` must be a table".to_string()))?;
            for (name, section) in env_table {
                let section: EnvSection =
                    section
                        .clone()
                        .try_into()
                        .map_err(|e: toml::de::Error| ProjectError::InvalidEnv {
                            name: name.clone(),
                            message: e.to_string(),
                        })?;
                envs.push((name.clone(), section));
            }
        }

        Ok(ProjectFile { root, envs })
    }

    /// Directory the project file lives in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Environment names in declaration order
    pub fn env_names(&self) -> Vec<&str> {
        self.envs.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn env(&self, name: &str) -> Result<&EnvSection, ProjectError> {
        self.envs
            .iter()
            .find(|(env_name, _)| env_name == name)
            .map(|(_, section)| section)
            .ok_or_else(|| ProjectError::UnknownEnv(name.to_string()))
    }
}
