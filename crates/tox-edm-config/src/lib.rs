//! Configuration shared by the tox-edm crates
//!
//! - [`env_paths`]: platform rules for environment bin directories
//! - [`project`]: the `tox-edm.toml` environment definition file

pub mod env_paths;
pub mod project;

pub use project::{EnvSection, ProjectError, ProjectFile, PROJECT_FILE_NAME};
