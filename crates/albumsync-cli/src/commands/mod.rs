//! CLI subcommands
//!
//! Every remote command builds a [`albumsync_sync::runner::SyncRunner`]
//! through [`context::CommandContext`], runs one entry point, prints the
//! report and logs out.

pub mod albums;
pub mod config;
pub mod context;
pub mod mounts;
pub mod personal;

use std::process::ExitCode;

/// Exit status for a finished pass
pub fn exit_code(has_errors: bool) -> ExitCode {
    if has_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
