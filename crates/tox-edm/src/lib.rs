//! tox-edm library - edm-backed test environment lifecycle
//!
//! The lifecycle operations live in [`hooks`]; the remaining modules carry
//! the edm handle, process execution, the environment model and the command
//! handlers used by the `tox-edm` binary.

pub mod commands;
pub mod common;
pub mod config_manager;
pub mod edm;
pub mod errors;
pub mod hooks;
pub mod process;
pub mod venv;

pub use common::GlobalOpts;
pub use tox_edm_logger as logger;
