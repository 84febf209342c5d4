//! Platform rules for edm environment paths
//!
//! edm environments follow the usual Python layout:
//! - **Unix/macOS**: executables live in `<prefix>/bin`
//! - **Windows**: the interpreter sits at the prefix root and scripts live in
//!   `<prefix>\Scripts`
//!
//! The platform is passed explicitly as an OS identifier (the values of
//! `std::env::consts::OS`) so callers can reason about a platform other than
//! the one they run on.

use std::path::{Component, Path, PathBuf};

/// OS identifier for platforms that keep executables in a `Scripts` directory
pub const WINDOWS_OS: &str = "windows";

/// Returns true when `os` keeps executables in a distinct `Scripts` subdirectory.
pub fn has_scripts_subdir(os: &str) -> bool {
    os == WINDOWS_OS
}

/// Name of the bin directory for the given OS identifier.
pub fn bin_dir_name(os: &str) -> &'static str {
    if has_scripts_subdir(os) {
        "Scripts"
    } else {
        "bin"
    }
}

/// Bin directory for an environment whose interpreter lives at `executable`.
///
/// Only platforms with a distinct scripts directory get an override; on
/// others the interpreter directory already is the bin directory, so `None`
/// is returned.
pub fn scripts_dir_for(executable: &Path, os: &str) -> Option<PathBuf> {
    if !has_scripts_subdir(os) {
        return None;
    }
    let parent = executable.parent().unwrap_or_else(|| Path::new(""));
    Some(parent.join(bin_dir_name(os)))
}

/// Make `path` absolute against `cwd` and normalize `.` and `..` lexically.
pub fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
