//! The edm command-line tool
//!
//! [`EdmLocator`] finds the executable, [`Edm`] builds the fixed argument
//! patterns for each subcommand and interprets their exit codes.

use crate::errors::{EdmError, Result};
use crate::process::{CommandRunner, Invocation};
use std::path::{Path, PathBuf};
use tox_edm_logger as logger;

/// Executable name looked up on `PATH`
pub const EDM_EXECUTABLE: &str = "edm";

const EDM_INSTALL_HINT: &str = "Install EDM from https://www.enthought.com/edm/ or set `edm-path` with `tox-edm config set edm-path <path>`";

/// Resolves the edm executable: a configured path wins, `PATH` is the fallback.
#[derive(Debug, Clone, Default)]
pub struct EdmLocator {
    configured: Option<PathBuf>,
}

impl EdmLocator {
    pub fn new(configured: Option<PathBuf>) -> Self {
        EdmLocator { configured }
    }

    pub fn locate(&self) -> Result<Edm> {
        if let Some(ref path) = self.configured {
            if path.is_file() {
                return Ok(Edm::new(path.clone()));
            }
            logger::warn(&format!(
                "Configured edm path no longer exists: {}",
                path.display()
            ));
        }

        which::which(EDM_EXECUTABLE)
            .map(Edm::new)
            .map_err(|e| EdmError::ToolNotFound(format!("{}. {}", e, EDM_INSTALL_HINT)))
    }
}

/// Handle on a resolved edm executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edm {
    path: PathBuf,
}

impl Edm {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Edm { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the executable
    pub fn directory(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(self.path.clone(), args)
    }

    /// `edm envs create <name> [--force] --version <version>`
    pub fn envs_create(&self, name: &str, version: &str, force: bool) -> Invocation {
        let mut args = vec!["envs", "create", name];
        if force {
            args.push("--force");
        }
        args.extend(["--version", version]);
        self.invocation(args)
    }

    /// `edm envs exists <name>`
    pub fn envs_exists(&self, name: &str) -> Invocation {
        self.invocation(["envs", "exists", name])
    }

    /// `edm prefix -e <name>`
    pub fn prefix(&self, name: &str) -> Invocation {
        self.invocation(["prefix", "-e", name])
    }

    /// `edm install -e <name> -y <deps...>`
    pub fn install(&self, name: &str, deps: &[String]) -> Invocation {
        let mut args: Vec<String> = ["install", "-e", name, "-y"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(deps.iter().cloned());
        self.invocation(args)
    }

    /// `edm run -e <name> -- <argv...>`
    pub fn run_in(&self, name: &str, argv: &[String]) -> Invocation {
        let mut args: Vec<String> = ["run", "-e", name, "--"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(argv.iter().cloned());
        self.invocation(args)
    }

    /// Whether the named environment exists. Any non-zero exit means "no".
    pub fn env_exists(&self, runner: &dyn CommandRunner, name: &str) -> Result<bool> {
        let output = runner.run(&self.envs_exists(name))?;
        logger::debug(&format!(
            "edm environment '{}' exists: {}",
            name,
            output.success()
        ));
        Ok(output.success())
    }
}

/// Run `invocation` and return its stdout, failing on a non-zero exit.
pub fn check_output(runner: &dyn CommandRunner, invocation: &Invocation) -> Result<String> {
    let output = runner.run(invocation)?;
    if !output.success() {
        return Err(EdmError::CommandFailed {
            command: invocation.display(),
            status: output.code,
            output: format!("{}{}", output.stdout, output.stderr),
        });
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutput;
    use std::fs;
    use tempfile::TempDir;

    struct FixedRunner(Option<i32>);

    impl CommandRunner for FixedRunner {
        fn run(&self, _invocation: &Invocation) -> Result<CommandOutput> {
            Ok(CommandOutput {
                code: self.0,
                stdout: "out\n".to_string(),
                stderr: String::new(),
            })
        }
    }

    fn edm() -> Edm {
        Edm::new("/opt/edm/bin/edm")
    }

    #[test]
    fn test_envs_create_arguments() {
        assert_eq!(
            edm().envs_create("py38", "3.8", false).args,
            vec!["envs", "create", "py38", "--version", "3.8"]
        );
        assert_eq!(
            edm().envs_create("py38", "3.8", true).args,
            vec!["envs", "create", "py38", "--force", "--version", "3.8"]
        );
    }

    #[test]
    fn test_install_arguments() {
        let deps = vec!["numpy".to_string(), "pandas==1.0".to_string()];
        assert_eq!(
            edm().install("py38", &deps).args,
            vec!["install", "-e", "py38", "-y", "numpy", "pandas==1.0"]
        );
    }

    #[test]
    fn test_run_in_arguments() {
        let argv = vec!["pip".to_string(), "freeze".to_string()];
        let invocation = edm().run_in("py38", &argv);
        assert_eq!(invocation.program, PathBuf::from("/opt/edm/bin/edm"));
        assert_eq!(invocation.args, vec!["run", "-e", "py38", "--", "pip", "freeze"]);
    }

    #[test]
    fn test_directory() {
        assert_eq!(edm().directory(), Some(Path::new("/opt/edm/bin")));
        assert_eq!(Edm::new("edm").directory(), None);
    }

    #[test]
    fn test_env_exists_maps_exit_code() {
        assert!(edm().env_exists(&FixedRunner(Some(0)), "py38").unwrap());
        assert!(!edm().env_exists(&FixedRunner(Some(1)), "py38").unwrap());
        assert!(!edm().env_exists(&FixedRunner(None), "py38").unwrap());
    }

    #[test]
    fn test_check_output() {
        let invocation = edm().prefix("py38");
        assert_eq!(
            check_output(&FixedRunner(Some(0)), &invocation).unwrap(),
            "out\n"
        );
        let err = check_output(&FixedRunner(Some(4)), &invocation).unwrap_err();
        assert!(matches!(
            err,
            EdmError::CommandFailed { status: Some(4), .. }
        ));
    }

    #[test]
    fn test_locator_prefers_configured_file() {
        let dir = TempDir::new().unwrap();
        let fake = dir.path().join("edm");
        fs::write(&fake, "").unwrap();
        let edm = EdmLocator::new(Some(fake.clone())).locate().unwrap();
        assert_eq!(edm.path(), fake.as_path());
    }
}
