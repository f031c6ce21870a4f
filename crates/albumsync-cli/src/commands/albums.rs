//! Album commands - reconcile, list and delete folder-bound albums

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use albumsync_core::domain::SyncReport;

use super::context::CommandContext;
use super::exit_code;
use crate::output::{print_listing, print_mount_report, print_serialized, print_sync_report};

/// Prints an album pass and maps it to an exit status
pub(super) fn finish(ctx: &CommandContext, title: &str, report: &SyncReport) -> ExitCode {
    let formatter = ctx.formatter();
    if ctx.is_json() {
        print_serialized(formatter.as_ref(), report);
    } else if !(ctx.quiet && report.is_noop() && !report.has_errors()) {
        print_sync_report(formatter.as_ref(), title, report);
    }
    exit_code(report.has_errors())
}

#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    /// Mounts, waits for the index, then reconciles shared-root albums
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let runner = ctx.build_runner()?;
        let result = runner.sync().await;
        runner.logout().await;
        let (mounts, albums) = result?;

        let formatter = ctx.formatter();
        if ctx.is_json() {
            print_serialized(
                formatter.as_ref(),
                &serde_json::json!({"mounts": mounts, "albums": albums}),
            );
        } else {
            print_mount_report(formatter.as_ref(), &mounts);
            print_sync_report(formatter.as_ref(), "Sync", &albums);
        }
        Ok(exit_code(mounts.has_errors() || albums.has_errors()))
    }
}

#[derive(Debug, Args)]
pub struct CreateAlbumsCommand {}

impl CreateAlbumsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let runner = ctx.build_runner()?;
        let result = runner.create_albums().await;
        runner.logout().await;
        Ok(finish(ctx, "Album reconciliation", &result?))
    }
}

#[derive(Debug, Args)]
pub struct DeleteAlbumsCommand {}

impl DeleteAlbumsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let runner = ctx.build_runner()?;
        let result = runner.delete_albums().await;
        runner.logout().await;
        Ok(finish(ctx, "Album deletion", &result?))
    }
}

#[derive(Debug, Args)]
pub struct ListAlbumsCommand {
    /// Only albums bound to this folder or below (e.g. "/Shared/Family")
    #[arg(long)]
    pub path: Option<String>,
}

impl ListAlbumsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let runner = ctx.build_runner()?;
        let result = runner.list_albums(self.path.as_deref()).await;
        runner.logout().await;
        let albums = result?;

        let formatter = ctx.formatter();
        if ctx.is_json() {
            print_serialized(formatter.as_ref(), &albums);
        } else {
            print_listing(formatter.as_ref(), &albums);
        }
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Debug, Args)]
pub struct DeleteAlbumCommand {
    /// Exact album name; every album with this name is deleted
    pub name: String,
}

impl DeleteAlbumCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let runner = ctx.build_runner()?;
        let result = runner.delete_album_by_name(&self.name).await;
        runner.logout().await;
        Ok(finish(ctx, "Album deletion", &result?))
    }
}
