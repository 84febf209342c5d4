//! Common types and utilities shared across modules

use clap::Parser;
use std::path::PathBuf;
use tox_edm_config::PROJECT_FILE_NAME;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "file",
        global = true,
        default_value = PROJECT_FILE_NAME,
        help = "Project file with the environment definitions"
    )]
    pub project_file: PathBuf,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
