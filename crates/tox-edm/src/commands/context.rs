use crate::config_manager::Config;
use crate::errors::{EdmError, Result};
use crate::hooks::EdmAdapter;
use crate::venv::{EnvConfig, TestEnv};
use crate::GlobalOpts;
use std::path::PathBuf;
use tox_edm_config::env_paths::absolutize;
use tox_edm_config::{ProjectError, ProjectFile};
use tox_edm_logger as logger;

/// Everything a command needs to drive environments of one project
pub struct EnvContext {
    pub config: Config,
    pub project: Option<ProjectFile>,
    pub root: PathBuf,
    pub work_dir: PathBuf,
}

impl EnvContext {
    /// Load the user config and the project file named in `opts`.
    pub fn load(opts: &GlobalOpts) -> Result<Self> {
        Self::load_inner(opts, true)
    }

    /// Like [`EnvContext::load`], but a missing project file is not an error.
    pub fn load_optional_project(opts: &GlobalOpts) -> Result<Self> {
        Self::load_inner(opts, false)
    }

    fn load_inner(opts: &GlobalOpts, require_project: bool) -> Result<Self> {
        let config =
            Config::load().map_err(|e| EdmError::Config(format!("Failed to load config: {e}")))?;
        let cwd = std::env::current_dir()?;

        let project = match ProjectFile::load(&opts.project_file) {
            Ok(project) => Some(project),
            Err(ProjectError::NotFound(path)) if !require_project => {
                logger::debug(&format!("No project file at {}", path.display()));
                None
            }
            Err(e) => return Err(e.into()),
        };

        let root = match project {
            Some(ref project) => absolutize(project.root(), &cwd),
            None => cwd,
        };
        let work_dir = config.work_dir_for(&root);
        logger::debug(&format!(
            "Project root: {}, work dir: {}",
            root.display(),
            work_dir.display()
        ));

        Ok(EnvContext {
            config,
            project,
            root,
            work_dir,
        })
    }

    pub fn adapter(&self) -> EdmAdapter {
        EdmAdapter::system(self.config.edm_locator())
    }

    fn project(&self) -> Result<&ProjectFile> {
        self.project.as_ref().ok_or_else(|| {
            EdmError::Config("no project file loaded".to_string())
        })
    }

    /// Environment names in declaration order
    pub fn env_names(&self) -> Result<Vec<String>> {
        Ok(self
            .project()?
            .env_names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    pub fn test_env(&self, name: &str) -> Result<TestEnv> {
        let section = self.project()?.env(name)?;
        let envconfig = EnvConfig::from_section(name, section, &self.root, &self.work_dir)?;
        Ok(TestEnv::new(envconfig))
    }

    /// Config for `name`, falling back to defaults when the project does not define it.
    pub fn env_config_or_default(&self, name: &str) -> Result<EnvConfig> {
        match self.project {
            Some(ref project) if project.env(name).is_ok() => Ok(self.test_env(name)?.envconfig),
            _ => Ok(EnvConfig::new(name, "", &self.work_dir)),
        }
    }
}
