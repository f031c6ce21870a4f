//! AlbumSync CLI - Command-line interface for AlbumSync
//!
//! Provides batch commands for:
//! - Bind-mounting shared photo folders into the personal library
//! - Creating, sharing and pruning folder-bound albums
//! - Personal-library albums with per-invocation overrides
//! - Listing and deleting albums, inspecting configuration

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use albumsync_core::config::LoggingConfig;

mod commands;
mod output;

use commands::{
    albums::{
        CreateAlbumsCommand, DeleteAlbumCommand, DeleteAlbumsCommand, ListAlbumsCommand,
        SyncCommand,
    },
    config::ConfigCommand,
    context::CommandContext,
    mounts::{EnsureMountsCommand, UnmountAndDeleteAllCommand, UnmountCommand},
    personal::PersonalCommand,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "albumsync",
    version,
    about = "Folder-bound album sync for Synology Photos"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Bind-mount shared roots and wait for them to be indexed
    EnsureMounts(EnsureMountsCommand),
    /// Full pass: mounts, index wait, album reconciliation
    Sync(SyncCommand),
    /// Reconcile shared-root albums without touching mounts
    CreateAlbums(CreateAlbumsCommand),
    /// Delete every album of the shared roots
    DeleteAlbums(DeleteAlbumsCommand),
    /// Reconcile albums for personal-library folders
    CreatePersonalAlbums(PersonalCommand),
    /// Delete every album of the personal roots
    DeletePersonalAlbums(PersonalCommand),
    /// Remove the shared roots' bind mounts
    Unmount(UnmountCommand),
    /// Delete shared-root albums, then remove every bind mount
    UnmountAndDeleteAll(UnmountAndDeleteAllCommand),
    /// List albums, optionally scoped to a folder subtree
    ListAlbums(ListAlbumsCommand),
    /// Delete albums by exact name
    DeleteAlbum(DeleteAlbumCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Installs the tracing subscriber
///
/// `RUST_LOG` wins, then `-v`, then `logging.level`. Logs go to stderr so
/// `--json` output on stdout stays parseable.
fn init_tracing(verbose: u8, quiet: bool, logging: &LoggingConfig) {
    let level = match verbose {
        0 if quiet => "warn",
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, ctx: CommandContext) -> Result<ExitCode> {
    match cli.command {
        Commands::EnsureMounts(cmd) => cmd.execute(&ctx).await,
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::CreateAlbums(cmd) => cmd.execute(&ctx).await,
        Commands::DeleteAlbums(cmd) => cmd.execute(&ctx).await,
        Commands::CreatePersonalAlbums(cmd) => cmd.execute_create(&ctx).await,
        Commands::DeletePersonalAlbums(cmd) => cmd.execute_delete(&ctx).await,
        Commands::Unmount(cmd) => cmd.execute(&ctx).await,
        Commands::UnmountAndDeleteAll(cmd) => cmd.execute(&ctx).await,
        Commands::ListAlbums(cmd) => cmd.execute(&ctx).await,
        Commands::DeleteAlbum(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let formatter = get_formatter(cli.json);

    let ctx = match CommandContext::load(cli.config.as_deref(), format, cli.quiet) {
        Ok(ctx) => ctx,
        Err(err) => {
            formatter.error(&format!("{err:#}"));
            return ExitCode::from(2);
        }
    };
    init_tracing(cli.verbose, cli.quiet, &ctx.config.logging);

    match run(cli, ctx).await {
        Ok(code) => code,
        Err(err) => {
            formatter.error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
