//! Mount commands - bind mounts of shared photo folders
//!
//! `ensure-mounts` needs a session for the index wait. `unmount` only
//! touches the local mount table and never logs in.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use tracing::info;

use albumsync_sync::roots::RootPlanner;

use super::context::CommandContext;
use super::exit_code;
use crate::output::{print_mount_report, print_serialized, print_sync_report, print_unmount_report};

#[derive(Debug, Args)]
pub struct EnsureMountsCommand {
    /// Do not wait for the mounted folders to appear in the index
    #[arg(long)]
    pub no_wait: bool,
}

impl EnsureMountsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let runner = ctx.build_runner()?;
        let result = runner.ensure_mounts(!self.no_wait).await;
        runner.logout().await;
        let report = result?;

        let formatter = ctx.formatter();
        if ctx.is_json() {
            print_serialized(formatter.as_ref(), &report);
        } else {
            print_mount_report(formatter.as_ref(), &report);
        }
        Ok(exit_code(report.has_errors()))
    }
}

#[derive(Debug, Args)]
pub struct UnmountCommand {
    /// Also remove mount points whose source root is no longer configured
    #[arg(long)]
    pub stale: bool,
}

impl UnmountCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let roots = RootPlanner::new(&ctx.config).shared_roots();
        info!(roots = roots.len(), stale = self.stale, "Removing bind mounts");

        let report = ctx
            .mount_reconciler()
            .unmount_all(&roots, self.stale)
            .await;

        let formatter = ctx.formatter();
        if ctx.is_json() {
            print_serialized(formatter.as_ref(), &report);
        } else {
            print_unmount_report(formatter.as_ref(), &report);
        }
        Ok(exit_code(report.has_errors()))
    }
}

#[derive(Debug, Args)]
pub struct UnmountAndDeleteAllCommand {}

impl UnmountAndDeleteAllCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let runner = ctx.build_runner()?;
        let result = runner.unmount_and_delete_all().await;
        runner.logout().await;
        let (albums, mounts) = result?;

        let formatter = ctx.formatter();
        if ctx.is_json() {
            print_serialized(
                formatter.as_ref(),
                &serde_json::json!({"albums": albums, "mounts": mounts}),
            );
        } else {
            print_sync_report(formatter.as_ref(), "Album deletion", &albums);
            print_unmount_report(formatter.as_ref(), &mounts);
        }
        Ok(exit_code(albums.has_errors() || mounts.has_errors()))
    }
}
