//! Test environment model
//!
//! The lifecycle operations receive these objects explicitly and mutate them
//! in place: [`EnvConfig::envbindir`] and [`EnvConfig::allowlist_externals`]
//! during creation, [`TestEnv::status`] while commands run.

use crate::errors::{EdmError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tox_edm_config::env_paths;
use tox_edm_config::EnvSection;
use tox_edm_logger as logger;

/// Configuration of a single test environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub envname: String,
    /// Interpreter name, e.g. `python3.8`
    pub basepython: String,
    pub commands: Vec<Vec<String>>,
    /// Working directory for test commands
    pub changedir: PathBuf,
    pub deps: Vec<String>,
    pub setenv: BTreeMap<String, String>,
    pub recreate: bool,
    pub ignore_errors: bool,
    pub ignore_outcome: bool,
    pub envdir: PathBuf,
    pub envbindir: PathBuf,
    pub envtmpdir: PathBuf,
    /// Paths that commands are allowed to run from outside the environment
    pub allowlist_externals: Vec<PathBuf>,
}

impl EnvConfig {
    /// Config with defaults; per-environment directories live under `work_dir/<envname>`.
    pub fn new(envname: &str, basepython: &str, work_dir: &Path) -> Self {
        let envdir = work_dir.join(envname);
        EnvConfig {
            envname: envname.to_string(),
            basepython: basepython.to_string(),
            commands: Vec::new(),
            changedir: PathBuf::from("."),
            deps: Vec::new(),
            setenv: BTreeMap::new(),
            recreate: false,
            ignore_errors: false,
            ignore_outcome: false,
            envbindir: envdir.join(env_paths::bin_dir_name(std::env::consts::OS)),
            envtmpdir: envdir.join("tmp"),
            envdir,
            allowlist_externals: Vec::new(),
        }
    }

    /// Build from an `[env.<name>]` table; `root` is the project directory.
    pub fn from_section(
        envname: &str,
        section: &EnvSection,
        root: &Path,
        work_dir: &Path,
    ) -> Result<Self> {
        let basepython = section.basepython_for(envname).ok_or_else(|| {
            EdmError::Config(format!(
                "environment '{}' has no basepython and none can be derived from its name",
                envname
            ))
        })?;

        let mut config = EnvConfig::new(envname, &basepython, work_dir);
        config.commands = section.commands.clone();
        config.deps = section.deps.clone();
        config.setenv = section.setenv.clone();
        config.recreate = section.recreate;
        config.ignore_errors = section.ignore_errors;
        config.ignore_outcome = section.ignore_outcome;
        config.changedir = match section.changedir {
            Some(ref dir) => root.join(dir),
            None => root.to_path_buf(),
        };
        Ok(config)
    }

    /// Register `path` as an allowed external command location.
    pub fn allow_external(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.allowlist_externals.contains(&path) {
            self.allowlist_externals.push(path);
        }
    }

    pub fn is_allowed_external(&self, path: &Path) -> bool {
        self.allowlist_externals
            .iter()
            .any(|allowed| path.starts_with(allowed))
    }
}

/// Outcome of the test commands of one environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnvStatus {
    #[default]
    Ok,
    IgnoredFailedCommand,
    CommandsFailed,
    KeyboardInterrupt,
}

impl EnvStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvStatus::Ok => "ok",
            EnvStatus::IgnoredFailedCommand => "ignored failed command",
            EnvStatus::CommandsFailed => "commands failed",
            EnvStatus::KeyboardInterrupt => "keyboardinterrupt",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EnvStatus::CommandsFailed | EnvStatus::KeyboardInterrupt)
    }
}

impl fmt::Display for EnvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A test environment as handed to the lifecycle operations
#[derive(Debug, Clone)]
pub struct TestEnv {
    pub envconfig: EnvConfig,
    pub status: EnvStatus,
}

impl TestEnv {
    pub fn new(envconfig: EnvConfig) -> Self {
        TestEnv {
            envconfig,
            status: EnvStatus::Ok,
        }
    }

    pub fn name(&self) -> &str {
        &self.envconfig.envname
    }
}

/// Logging handle for one lifecycle step of one environment
#[derive(Debug, Clone)]
pub struct Action {
    venvname: String,
    activity: String,
}

impl Action {
    pub fn new(venvname: &str, activity: &str) -> Self {
        Action {
            venvname: venvname.to_string(),
            activity: activity.to_string(),
        }
    }

    pub fn for_env(venv: &TestEnv, activity: &str) -> Self {
        Action::new(venv.name(), activity)
    }

    pub fn venvname(&self) -> &str {
        &self.venvname
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    /// Switch to a new activity and report it.
    pub fn set_activity(&mut self, name: &str, message: &str) {
        self.activity = name.to_string();
        logger::activity(&self.venvname, name, message);
    }
}
