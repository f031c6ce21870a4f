//! Personal-library album commands
//!
//! Without options, the configured `personal_roots` are used. `--path`
//! replaces them with one ad-hoc root; the other options override the
//! corresponding setting on every selected root.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use albumsync_core::domain::Permission;
use albumsync_sync::roots::PersonalOverrides;

use super::albums::finish;
use super::context::CommandContext;

#[derive(Debug, Clone, Default, Args)]
pub struct PersonalCommand {
    /// Folder below the Photos folder, absolute or relative to it
    #[arg(long)]
    pub path: Option<String>,

    /// Album name prefix for the selected root
    #[arg(long)]
    pub label_prefix: Option<String>,

    /// Users or groups to share with (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub share_with: Option<Vec<String>>,

    /// Role names for share targets (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub roles: Option<Vec<String>>,

    /// Access level: view or download
    #[arg(long, value_parser = parse_permission)]
    pub permission: Option<Permission>,

    /// Maximum folder depth below the root; negative means unlimited
    #[arg(long, allow_negative_numbers = true)]
    pub max_depth: Option<i64>,
}

fn parse_permission(raw: &str) -> Result<Permission, String> {
    raw.parse().map_err(|err| format!("{err}"))
}

fn clean_list(items: &Option<Vec<String>>) -> Option<Vec<String>> {
    items.as_ref().map(|items| {
        items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

impl PersonalCommand {
    pub fn overrides(&self) -> PersonalOverrides {
        PersonalOverrides {
            path: self.path.clone(),
            label_prefix: self.label_prefix.clone(),
            share_with: clean_list(&self.share_with),
            roles: clean_list(&self.roles),
            permission: self.permission,
            max_depth: self.max_depth,
        }
    }

    pub async fn execute_create(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let runner = ctx.build_runner()?;
        let result = runner.create_personal_albums(&self.overrides()).await;
        runner.logout().await;
        Ok(finish(ctx, "Personal album reconciliation", &result?))
    }

    pub async fn execute_delete(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let runner = ctx.build_runner()?;
        let result = runner.delete_personal_albums(&self.overrides()).await;
        runner.logout().await;
        Ok(finish(ctx, "Personal album deletion", &result?))
    }
}
