//! Config command - View and validate AlbumSync configuration
//!
//! Provides the `albumsync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON), environment
//!    overrides included
//! 2. Validates it and reports every error found

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use super::context::CommandContext;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Validate => Ok(execute_validate(ctx)),
        }
    }
}

fn execute_show(ctx: &CommandContext) -> Result<ExitCode> {
    let formatter = ctx.formatter();
    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.is_json() {
        let json = serde_json::to_value(&ctx.config)
            .context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        formatter.info("");
        let yaml =
            serde_yaml::to_string(&ctx.config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn execute_validate(ctx: &CommandContext) -> ExitCode {
    let formatter = ctx.formatter();
    let errors = ctx.config.validate();

    if ctx.is_json() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": ctx.config_path.display().to_string(),
            "errors": messages,
        }));
    } else if errors.is_empty() {
        formatter.success(&format!(
            "Configuration is valid ({})",
            ctx.config_path.display()
        ));
    } else {
        formatter.error(&format!(
            "Configuration has {} error(s) ({})",
            errors.len(),
            ctx.config_path.display()
        ));
        for err in &errors {
            formatter.info(&format!("  - {err}"));
        }
    }

    if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
