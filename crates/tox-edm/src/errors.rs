//! Centralized error types for tox-edm

use std::io;
use thiserror::Error;
use tox_edm_config::ProjectError;

/// Errors raised while driving edm environments
#[derive(Error, Debug)]
pub enum EdmError {
    #[error("UnsupportedInterpreter: {0}")]
    UnsupportedInterpreter(String),

    #[error("edm executable not found: {0}")]
    ToolNotFound(String),

    #[error("InvocationError for command {command} (exited with code {})", exit_code_display(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },

    #[error("keyboardinterrupt while running {command}")]
    Interrupted { command: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Project(#[from] ProjectError),
}

pub type Result<T> = std::result::Result<T, EdmError>;

fn exit_code_display(status: &Option<i32>) -> String {
    status.map_or_else(|| "unknown".to_string(), |code| code.to_string())
}
