//! Lifecycle operations backed by edm
//!
//! [`EdmAdapter`] replaces the default environment handling of a test run:
//!
//! | operation                | edm calls                                             |
//! |--------------------------|-------------------------------------------------------|
//! | `create_environment`     | `envs exists`, `envs create [--force]`, `prefix`      |
//! | `install_dependencies`   | `install -e <env> -y <deps...>`                       |
//! | `report_environment`     | `run -e <env> -- pip freeze`                          |
//! | `run_tests`              | `run -e <env> -- <argv...>` per configured command    |
//! | `get_python_executable`  | `envs exists`, `run -e <env> -- python -c ...`        |
//!
//! The edm executable is resolved afresh by every operation.

use crate::edm::{check_output, EdmLocator};
use crate::errors::{EdmError, Result};
use crate::process::{CommandRunner, Invocation, OutputMode, SystemRunner};
use crate::venv::{Action, EnvConfig, EnvStatus, TestEnv};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tox_edm_config::env_paths;
use tox_edm_logger as logger;

/// Interpreter name pattern; only the prefix has to match.
const INTERPRETER_PATTERN: &str = r"^python(\d)\.(\d)";

/// Prints the interpreter path without a trailing newline
pub const INTROSPECTION_SCRIPT: &str = "import sys; sys.stdout.write(sys.executable)";

/// Command run inside the environment to list installed packages
pub const REPORT_COMMAND: [&str; 2] = ["pip", "freeze"];

/// What the command loop does after a failed test command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandControl {
    /// Go on with the next command
    Continue,
    /// Skip the remaining commands
    Stop,
    /// Abort and hand the error to the caller
    Propagate,
}

/// Extract `<major>.<minor>` from an interpreter name such as `python3.8`.
pub fn parse_interpreter_version(basepython: &str) -> Result<String> {
    let pattern = Regex::new(INTERPRETER_PATTERN)
        .map_err(|e| EdmError::Config(format!("invalid interpreter pattern: {}", e)))?;
    let captures = pattern.captures(basepython).ok_or_else(|| {
        EdmError::UnsupportedInterpreter(format!(
            "edm cannot infer version from {:?}",
            basepython
        ))
    })?;
    Ok(format!("{}.{}", &captures[1], &captures[2]))
}

/// Lines of the last blank-line separated block of `output`.
///
/// edm may print progress text before the command's own output; only the
/// final block belongs to the command.
pub fn last_output_block(output: &str) -> Vec<String> {
    let normalized = output.replace("\r\n", "\n");
    let text = normalized.trim_end();
    let block = match text.rfind("\n\n") {
        Some(index) => &text[index + 2..],
        None => text,
    };
    block.trim().lines().map(str::to_string).collect()
}

/// Handle the "ignore exit code" marker on the first argument.
///
/// A first argument starting with `-` marks the command as allowed to fail.
/// A lone `-` is dropped, otherwise every leading dash is stripped. Returns
/// whether the marker was present.
pub fn split_ignore_marker(argv: &mut Vec<String>) -> bool {
    let Some(first) = argv.first_mut() else {
        return false;
    };
    if !first.starts_with('-') {
        return false;
    }
    if first.as_str() == "-" {
        argv.remove(0);
    } else {
        *first = first.trim_start_matches('-').to_string();
    }
    true
}

/// The program of `argv` when it is an absolute path outside the allowlist.
///
/// Bare names are resolved by `edm run` inside the environment and are not
/// reported.
fn unlisted_program<'a>(envconfig: &EnvConfig, argv: &'a [String]) -> Option<&'a Path> {
    let program = Path::new(argv.first()?);
    if program.is_absolute() && !envconfig.is_allowed_external(program) {
        Some(program)
    } else {
        None
    }
}

/// Delete `dir` if present and create it empty.
fn make_emptydir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Environment variables for test commands
fn test_environment(envconfig: &EnvConfig) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("TOX_ENV_NAME".to_string(), envconfig.envname.clone());
    env.insert(
        "TOX_ENV_DIR".to_string(),
        envconfig.envdir.display().to_string(),
    );
    env.extend(envconfig.setenv.clone());
    env
}

/// Runs the environment lifecycle through edm.
pub struct EdmAdapter<R: CommandRunner = SystemRunner> {
    runner: R,
    locator: EdmLocator,
    os: String,
}

impl EdmAdapter<SystemRunner> {
    pub fn system(locator: EdmLocator) -> Self {
        EdmAdapter::new(SystemRunner, locator)
    }
}

impl<R: CommandRunner> EdmAdapter<R> {
    pub fn new(runner: R, locator: EdmLocator) -> Self {
        EdmAdapter {
            runner,
            locator,
            os: std::env::consts::OS.to_string(),
        }
    }

    /// Use the path conventions of another platform (an OS identifier such as `windows`).
    pub fn with_os(mut self, os: &str) -> Self {
        self.os = os.to_string();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn check_output_with_spinner(&self, message: &str, invocation: &Invocation) -> Result<String> {
        logger::spinner_start(message);
        match check_output(&self.runner, invocation) {
            Ok(output) => {
                logger::spinner_success(message);
                Ok(output)
            }
            Err(e) => {
                logger::spinner_error(message);
                Err(e)
            }
        }
    }

    /// Create the edm environment (or reuse it) and point the env at its prefix.
    pub fn create_environment(&self, venv: &mut TestEnv, action: &mut Action) -> Result<()> {
        let version = parse_interpreter_version(&venv.envconfig.basepython)?;
        let edm = self.locator.locate()?;
        if let Some(dir) = edm.directory() {
            venv.envconfig.allow_external(dir);
        }

        let name = action.venvname().to_string();
        if venv.envconfig.recreate {
            action.set_activity("recreate", &format!("edm environment {} (python {})", name, version));
            self.check_output_with_spinner(
                &format!("Recreating edm environment {}", name),
                &edm.envs_create(&name, &version, true),
            )?;
        } else if !edm.env_exists(&self.runner, &name)? {
            action.set_activity("create", &format!("edm environment {} (python {})", name, version));
            self.check_output_with_spinner(
                &format!("Creating edm environment {}", name),
                &edm.envs_create(&name, &version, false),
            )?;
        } else {
            logger::debug(&format!("Reusing existing edm environment {}", name));
        }

        let prefix = check_output(&self.runner, &edm.prefix(&name))?;
        let prefix = PathBuf::from(prefix.trim());
        logger::debug(&format!("edm environment {} prefix: {}", name, prefix.display()));
        venv.envconfig.envbindir = prefix.clone();
        venv.envconfig.allow_external(prefix);
        Ok(())
    }

    /// Install the configured dependencies into the edm environment.
    pub fn install_dependencies(&self, venv: &TestEnv, action: &mut Action) -> Result<()> {
        let deps = &venv.envconfig.deps;
        if deps.is_empty() {
            return Ok(());
        }

        let depinfo = deps.join(" ");
        action.set_activity("installdeps", &depinfo);
        let edm = self.locator.locate()?;
        self.check_output_with_spinner(
            &format!("Installing {}", depinfo),
            &edm.install(action.venvname(), deps),
        )?;
        Ok(())
    }

    /// Installed packages of the environment, one `name==version` per entry.
    ///
    /// Only stdout is parsed; edm and pip diagnostics on stderr go to the log
    /// file and never end up in the package list.
    pub fn report_environment(&self, venv: &TestEnv, action: &mut Action) -> Result<Vec<String>> {
        let edm = self.locator.locate()?;
        let argv: Vec<String> = REPORT_COMMAND.iter().map(|s| s.to_string()).collect();
        let output = check_output(&self.runner, &edm.run_in(action.venvname(), &argv))?;
        let packages = last_output_block(&output);
        logger::debug(&format!(
            "{} installed packages: {}",
            venv.name(),
            packages.join(",")
        ));
        Ok(packages)
    }

    /// Run every configured command inside the environment.
    ///
    /// Failures are reported through `venv.status`; only an interrupt is
    /// returned as an error.
    pub fn run_tests(&self, venv: &mut TestEnv, action: &mut Action, redirect: bool) -> Result<()> {
        venv.status = EnvStatus::Ok;
        make_emptydir(&venv.envconfig.envtmpdir)?;

        let edm = self.locator.locate()?;
        let name = action.venvname().to_string();
        let cwd = venv.envconfig.changedir.clone();
        let env = test_environment(&venv.envconfig);
        let output_mode = if redirect {
            OutputMode::Capture
        } else {
            OutputMode::Inherit
        };

        let commands = venv.envconfig.commands.clone();
        for (i, command) in commands.iter().enumerate() {
            action.set_activity("runtests", &format!("commands[{}] | {}", i, command.join(" ")));

            let mut argv = command.clone();
            let ignore_ret = split_ignore_marker(&mut argv);
            if let Some(program) = unlisted_program(&venv.envconfig, &argv) {
                logger::debug(&format!(
                    "{} is not in the allowlist of {}",
                    program.display(),
                    name
                ));
            }
            let invocation = edm
                .run_in(&name, &argv)
                .with_cwd(&cwd)
                .with_env(&env)
                .with_output(output_mode);
            logger::step(&format!("Running {}", invocation.display()));

            let failure = match self.runner.run(&invocation) {
                Ok(output) if output.success() => continue,
                Ok(output) if ignore_ret => {
                    logger::debug(&format!(
                        "Ignoring exit code {:?} of {}",
                        output.code,
                        invocation.display()
                    ));
                    continue;
                }
                Ok(output) => EdmError::CommandFailed {
                    command: invocation.display(),
                    status: output.code,
                    output: format!("{}{}", output.stdout, output.stderr),
                },
                Err(e) => e,
            };

            match on_command_failure(venv, &failure) {
                CommandControl::Continue => continue,
                CommandControl::Stop => break,
                CommandControl::Propagate => return Err(failure),
            }
        }
        Ok(())
    }

    /// Absolute path of the environment's interpreter, `None` if the
    /// environment does not exist yet.
    pub fn get_python_executable(&self, envconfig: &mut EnvConfig) -> Result<Option<PathBuf>> {
        let edm = self.locator.locate()?;
        if !edm.env_exists(&self.runner, &envconfig.envname)? {
            return Ok(None);
        }

        let argv: Vec<String> = ["python", "-c", INTROSPECTION_SCRIPT]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = check_output(&self.runner, &edm.run_in(&envconfig.envname, &argv))?;
        let cwd = std::env::current_dir()?;
        let executable = env_paths::absolutize(Path::new(output.trim()), &cwd);

        if let Some(scripts) = env_paths::scripts_dir_for(&executable, &self.os) {
            envconfig.envbindir = scripts;
        }
        Ok(Some(executable))
    }
}

/// Record a failed test command on `venv` and decide how the loop proceeds.
fn on_command_failure(venv: &mut TestEnv, failure: &EdmError) -> CommandControl {
    if let EdmError::Interrupted { .. } = failure {
        venv.status = EnvStatus::KeyboardInterrupt;
        logger::error(EnvStatus::KeyboardInterrupt.as_str());
        return CommandControl::Propagate;
    }

    if venv.envconfig.ignore_outcome {
        logger::warn(&format!(
            "command failed but result from testenv is ignored\n  cmd: {}",
            failure
        ));
        venv.status = EnvStatus::IgnoredFailedCommand;
        return CommandControl::Continue;
    }

    logger::error(&failure.to_string());
    venv.status = EnvStatus::CommandsFailed;
    if venv.envconfig.ignore_errors {
        CommandControl::Continue
    } else {
        CommandControl::Stop
    }
}
