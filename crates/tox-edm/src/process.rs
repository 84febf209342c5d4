//! Blocking subprocess execution
//!
//! Every external call goes through [`CommandRunner`] so the lifecycle
//! operations can be exercised against a scripted runner in tests.

use crate::errors::{EdmError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use tox_edm_logger as logger;
use tracing::debug;

#[cfg(unix)]
const SIGINT: i32 = 2;

/// Exit code Windows reports for a process terminated by Ctrl+C
#[cfg(windows)]
const STATUS_CONTROL_C_EXIT: i32 = 0xC000_013A_u32 as i32;

/// Set once Ctrl+C reaches this process
static INTERRUPT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Keep this process alive on Ctrl+C so the interrupted child can be reported.
///
/// The terminal delivers the signal to the whole foreground process group:
/// the running child dies from it, this process only records it.
pub fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        INTERRUPT_REQUESTED.store(true, Ordering::SeqCst);
    })
    .map_err(|e| EdmError::Config(format!("Failed to set Ctrl+C handler: {}", e)))
}

/// Whether Ctrl+C was received since startup
pub fn interrupt_requested() -> bool {
    INTERRUPT_REQUESTED.load(Ordering::SeqCst)
}

/// Where a child's output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout/stderr; they are written to the log file, not the console
    Capture,
    /// Share the console with the child
    Inherit,
}

/// A single external command, fully described before it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub output: OutputMode,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: BTreeMap::new(),
            output: OutputMode::Capture,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Command line as shown in logs and error messages
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Result of a child that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the child was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs invocations to completion.
///
/// Implementations return `Err` only when the child could not be spawned or
/// was interrupted; a non-zero exit is reported through [`CommandOutput::code`].
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        if interrupt_requested() {
            return Err(EdmError::Interrupted {
                command: invocation.display(),
            });
        }

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(ref cwd) = invocation.cwd {
            command.current_dir(cwd);
        }
        command.envs(&invocation.env);

        debug!(
            command = %invocation.display(),
            cwd = ?invocation.cwd,
            mode = ?invocation.output,
            "spawning"
        );

        match invocation.output {
            OutputMode::Capture => {
                let output = command.stdin(Stdio::null()).output()?;
                logger::capture_output(&invocation.display(), &output);
                check_interrupted(&output.status, invocation, interrupt_requested())?;
                Ok(CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            OutputMode::Inherit => {
                let status = command.status()?;
                debug!(command = %invocation.display(), code = ?status.code(), "exited");
                check_interrupted(&status, invocation, interrupt_requested())?;
                Ok(CommandOutput {
                    code: status.code(),
                    ..CommandOutput::default()
                })
            }
        }
    }
}

/// A child counts as interrupted when it died from SIGINT, or when it failed
/// after Ctrl+C reached this process (a child may catch the signal and exit
/// with its own code).
fn check_interrupted(status: &ExitStatus, invocation: &Invocation, requested: bool) -> Result<()> {
    if requested && !status.success() {
        return Err(EdmError::Interrupted {
            command: invocation.display(),
        });
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if status.signal() == Some(SIGINT) {
            return Err(EdmError::Interrupted {
                command: invocation.display(),
            });
        }
    }
    #[cfg(windows)]
    {
        if status.code() == Some(STATUS_CONTROL_C_EXIT) {
            return Err(EdmError::Interrupted {
                command: invocation.display(),
            });
        }
    }
    Ok(())
}
