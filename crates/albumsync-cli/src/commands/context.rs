//! Shared command context: configuration loading and adapter wiring

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use albumsync_core::config::Config;
use albumsync_dsm::{Credentials, DsmAuthSession, DsmClient, SynologyPhotos, SynologyWebSharing};
use albumsync_sync::bind_mount::SystemMountPrimitive;
use albumsync_sync::mounts::MountReconciler;
use albumsync_sync::runner::SyncRunner;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Configuration and output settings for one invocation
pub struct CommandContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    /// Loads configuration and applies `SYNOLOGY_*` environment overrides
    ///
    /// A missing file at the default location falls back to defaults; a
    /// missing file that was named explicitly is an error.
    pub fn load(explicit: Option<&Path>, format: OutputFormat, quiet: bool) -> Result<Self> {
        let (config_path, named) = Config::resolve_path(explicit);
        let mut config = Self::read_config(&config_path, named)?;
        config.apply_env_overrides();

        Ok(Self {
            config,
            config_path,
            format,
            quiet,
        })
    }

    fn read_config(path: &Path, named: bool) -> Result<Config> {
        if named || path.exists() {
            Config::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        } else {
            debug!(config_path = %path.display(), "No configuration file, using defaults");
            Ok(Config::default())
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.is_json())
    }

    /// Fails with every validation message joined
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.config.validate();
        if errors.is_empty() {
            return Ok(());
        }
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("Invalid configuration: {}", messages.join("; "))
    }

    /// Mount reconciler that needs neither credentials nor a session
    pub fn mount_reconciler(&self) -> MountReconciler {
        MountReconciler::new(
            Arc::new(SystemMountPrimitive::new(self.config.mounts.enabled)),
            self.config.personal_link_root(),
            self.config.paths.mount_prefix.clone(),
        )
    }

    /// Wires the DSM adapters into a runner
    ///
    /// The password comes from `SYNOLOGY_PASSWORD`, the optional TOTP seed
    /// from `SYNOLOGY_OTP_SECRET`.
    pub fn build_runner(&self) -> Result<SyncRunner> {
        self.ensure_valid()?;

        let credentials = Credentials::from_env(&self.config.dsm.username)
            .context("Failed to read DSM credentials")?;
        let client = Arc::new(
            DsmClient::new(&self.config.dsm).context("Failed to create DSM HTTP client")?,
        );

        info!(
            endpoint = %client.endpoint(),
            username = %self.config.dsm.username,
            otp = credentials.has_otp(),
            "Connecting to DSM"
        );

        let auth = Arc::new(DsmAuthSession::new(Arc::clone(&client), credentials));
        let photos = Arc::new(SynologyPhotos::new(Arc::clone(&client), &self.config.sharing));
        let web_sharing = Arc::new(SynologyWebSharing::new(
            Arc::clone(&client),
            &self.config.dsm,
            &self.config.sharing,
        ));
        let mounts = Arc::new(SystemMountPrimitive::new(self.config.mounts.enabled));

        Ok(SyncRunner::new(
            self.config.clone(),
            auth,
            photos,
            web_sharing,
            mounts,
        ))
    }
}
