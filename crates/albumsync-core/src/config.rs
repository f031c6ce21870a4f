//! Configuration module for AlbumSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! pattern for programmatic use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::album::DEFAULT_LABEL_SEPARATOR;
use crate::domain::newtypes::IndexPath;
use crate::domain::root::{Permission, ShareSpec};

/// Environment variable naming an alternate configuration file
pub const CONFIG_PATH_ENV: &str = "ALBUMSYNC_CONFIG";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for AlbumSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dsm: DsmConfig,
    pub paths: PathsConfig,
    pub mounts: MountsConfig,
    pub media: MediaConfig,
    pub indexing: IndexingConfig,
    pub retry: RetryConfig,
    pub sharing: SharingConfig,
    pub personal_roots: Vec<PersonalRootConfig>,
    pub logging: LoggingConfig,
}

/// Connection settings for the DSM web API.
///
/// The password is never read from this file; see `SYNOLOGY_PASSWORD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DsmConfig {
    /// Hostname or IP address of the NAS.
    pub host: String,
    pub port: u16,
    /// Force HTTPS on or off; by default HTTPS is used on ports 443 and 5001.
    pub https: Option<bool>,
    /// Verify the server certificate.
    pub verify_tls: bool,
    /// Account whose personal photo library is managed.
    pub username: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Filesystem layout on the NAS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Parent of every user's home directory.
    pub personal_homes_root: PathBuf,
    /// Directory inside the personal Photos folder that holds mount points.
    pub personal_shared_subdir: String,
    /// Root of the shared photo namespace.
    pub shared_photo_root: PathBuf,
    /// Prefix of every mount point directory name.
    pub mount_prefix: String,
}

/// Bind mount settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MountsConfig {
    pub enabled: bool,
}

/// On-disk media discovery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Maximum folder depth scanned below a root; 0 means unbounded.
    pub scan_max_depth: i64,
}

/// When the index waiter asks the service to reindex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReindexPolicy {
    /// Trigger once, after the first poll finds missing paths.
    #[default]
    FirstAttempt,
    /// Trigger after every poll that finds missing paths.
    EveryAttempt,
    Never,
}

/// Index convergence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Number of folder index polls before giving up.
    pub wait_attempts: u32,
    /// Seconds between polls.
    pub wait_delay_secs: u64,
    pub reindex_policy: ReindexPolicy,
    /// Trigger a reindex after mounts changed.
    pub reindex_after_mount: bool,
    /// Trigger a global reindex before every wait.
    pub force_reindex_on_start: bool,
    /// Seconds to wait for the indexing job to go idle after a trigger.
    pub settle_secs: u64,
    /// Host command run when the API reindex call fails.
    ///
    /// `{user}` and `{path}` are substituted.
    pub reindex_command: Option<String>,
}

/// Retry discipline for transient remote errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_secs: u64,
}

/// Album sharing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingConfig {
    /// Shared roots to manage; empty means every folder under `shared_photo_root`.
    #[serde(deserialize_with = "string_list")]
    pub managed_roots: Vec<String>,
    /// Share targets per shared root name.
    #[serde(deserialize_with = "string_list_map")]
    pub root_share_with: BTreeMap<String, Vec<String>>,
    /// Album label per shared root name; defaults to the root name.
    pub root_labels: BTreeMap<String, String>,
    #[serde(deserialize_with = "string_list")]
    pub default_share_with: Vec<String>,
    pub default_permission: Permission,
    #[serde(deserialize_with = "string_list")]
    pub default_roles: Vec<String>,
    /// Allow the passphrase-link fallback when per-user sharing is rejected.
    pub enable_public_sharing: bool,
    /// Base URL used when logging share links.
    pub share_link_base: Option<String>,
    /// Separator between root label and child folder name.
    pub label_separator: String,
    /// Error codes of the primary share call that trigger the fallback.
    pub fallback_error_codes: Vec<i64>,
}

/// A folder of the personal photo library to manage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalRootConfig {
    /// Path relative to (or absolute under) the personal Photos folder.
    #[serde(alias = "relative_path")]
    pub path: String,
    /// Album label; defaults to the relative path with `/` shown as ` - `.
    pub label: Option<String>,
    #[serde(deserialize_with = "optional_string_list")]
    pub share_with: Option<Vec<String>>,
    #[serde(alias = "share_permission")]
    pub permission: Option<Permission>,
    #[serde(alias = "share_roles", deserialize_with = "optional_string_list")]
    pub roles: Option<Vec<String>>,
    pub max_depth: Option<i64>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// List fields: YAML sequence or comma-separated string
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            OneOrMany::One(csv) => csv.split(',').map(str::to_string).collect(),
            OneOrMany::Many(items) => items,
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<OneOrMany>::deserialize(deserializer)?
        .map(OneOrMany::into_vec)
        .unwrap_or_default())
}

fn optional_string_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(OneOrMany::into_vec))
}

fn string_list_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<String>>, D::Error> {
    let raw = Option::<BTreeMap<String, OneOrMany>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(root, targets)| (root, targets.into_vec()))
        .collect())
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/albumsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("albumsync")
            .join("config.yaml")
    }

    /// Configuration file to use: `explicit`, else `$ALBUMSYNC_CONFIG`,
    /// else [`Config::default_path`].
    ///
    /// The flag is `true` when the path was named explicitly, in which case
    /// a missing file is an error rather than a reason to use defaults.
    pub fn resolve_path(explicit: Option<&Path>) -> (PathBuf, bool) {
        if let Some(path) = explicit {
            return (path.to_path_buf(), true);
        }
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => (PathBuf::from(path), true),
            _ => (Self::default_path(), false),
        }
    }

    /// Applies `SYNOLOGY_IP`, `SYNOLOGY_PORT` and `SYNOLOGY_USERNAME` from
    /// the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary variable source.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("SYNOLOGY_IP").filter(|v| !v.trim().is_empty()) {
            self.dsm.host = host.trim().to_string();
        }
        if let Some(port) = lookup("SYNOLOGY_PORT").and_then(|v| v.trim().parse().ok()) {
            self.dsm.port = port;
        }
        if let Some(user) = lookup("SYNOLOGY_USERNAME").filter(|v| !v.trim().is_empty()) {
            self.dsm.username = user.trim().to_string();
        }
    }
}

// ---------------------------------------------------------------------------
// Derived paths and share specs
// ---------------------------------------------------------------------------

impl DsmConfig {
    /// Whether requests use HTTPS.
    pub fn use_https(&self) -> bool {
        self.https.unwrap_or(matches!(self.port, 443 | 5001))
    }

    /// Host as it appears in a URL (IPv6 literals bracketed).
    pub fn url_host(&self) -> String {
        let host = self.host.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        }
    }

    /// Base URL of the web server, e.g. `https://nas.local:5001`.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https() { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.url_host(), self.port)
    }
}

impl Config {
    /// The user's personal Photos folder, e.g. `/volume1/homes/alice/Photos`.
    pub fn personal_photos_root(&self) -> PathBuf {
        self.paths
            .personal_homes_root
            .join(&self.dsm.username)
            .join("Photos")
    }

    /// Directory holding the shared-root mount points.
    pub fn personal_link_root(&self) -> PathBuf {
        self.personal_photos_root()
            .join(&self.paths.personal_shared_subdir)
    }

    /// Virtual path of the mount point directory, e.g. `/photos-shared`.
    pub fn virtual_shared_root(&self) -> IndexPath {
        IndexPath::new(&self.paths.personal_shared_subdir)
    }

    /// Mount point directory name for a shared root.
    pub fn mount_alias(&self, root_name: &str) -> String {
        format!("{}{}", self.paths.mount_prefix, root_name)
    }

    /// Album label for a shared root.
    pub fn shared_root_label(&self, root_name: &str) -> String {
        self.sharing
            .root_labels
            .get(root_name)
            .cloned()
            .unwrap_or_else(|| root_name.to_string())
    }

    /// Share spec for a shared root: its own targets, or the defaults.
    pub fn shared_root_share(&self, root_name: &str) -> ShareSpec {
        let targets = self
            .sharing
            .root_share_with
            .get(root_name)
            .unwrap_or(&self.sharing.default_share_with);
        ShareSpec::new(
            targets,
            self.sharing.default_permission,
            &self.sharing.default_roles,
        )
    }

    /// Share spec for a personal root entry, falling back to the defaults.
    pub fn personal_root_share(&self, entry: &PersonalRootConfig) -> ShareSpec {
        ShareSpec::new(
            entry
                .share_with
                .as_ref()
                .unwrap_or(&self.sharing.default_share_with),
            entry.permission.unwrap_or(self.sharing.default_permission),
            entry.roles.as_ref().unwrap_or(&self.sharing.default_roles),
        )
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for DsmConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 5001,
            https: None,
            verify_tls: true,
            username: String::new(),
            timeout_secs: 30,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            personal_homes_root: PathBuf::from("/volume1/homes"),
            personal_shared_subdir: "photos-shared".to_string(),
            shared_photo_root: PathBuf::from("/volume1/photo"),
            mount_prefix: "mount_".to_string(),
        }
    }
}

impl Default for MountsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            wait_attempts: 12,
            wait_delay_secs: 5,
            reindex_policy: ReindexPolicy::FirstAttempt,
            reindex_after_mount: true,
            force_reindex_on_start: false,
            settle_secs: 10,
            reindex_command: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_secs: 5,
        }
    }
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            managed_roots: Vec::new(),
            root_share_with: BTreeMap::new(),
            root_labels: BTreeMap::new(),
            default_share_with: Vec::new(),
            default_permission: Permission::View,
            default_roles: Vec::new(),
            enable_public_sharing: true,
            share_link_base: None,
            label_separator: DEFAULT_LABEL_SEPARATOR.to_string(),
            fallback_error_codes: vec![120],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"indexing.wait_attempts"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            });
        };

        // --- dsm ---
        if self.dsm.host.trim().is_empty() {
            push("dsm.host", "must be set (or SYNOLOGY_IP)".into());
        }
        if self.dsm.port == 0 {
            push("dsm.port", "must be greater than 0".into());
        }
        if self.dsm.username.trim().is_empty() {
            push("dsm.username", "must be set (or SYNOLOGY_USERNAME)".into());
        } else if self.dsm.username.contains('/') {
            push("dsm.username", "must not contain '/'".into());
        }
        if self.dsm.timeout_secs == 0 {
            push("dsm.timeout_secs", "must be greater than 0".into());
        }

        // --- paths ---
        if !self.paths.personal_homes_root.is_absolute() {
            push("paths.personal_homes_root", "must be an absolute path".into());
        }
        if !self.paths.shared_photo_root.is_absolute() {
            push("paths.shared_photo_root", "must be an absolute path".into());
        }
        if self.virtual_shared_root().is_root() {
            push("paths.personal_shared_subdir", "must not be empty".into());
        }
        if self.paths.mount_prefix.trim().is_empty() {
            push("paths.mount_prefix", "must not be empty".into());
        }

        // --- indexing / retry ---
        if self.indexing.wait_attempts == 0 {
            push("indexing.wait_attempts", "must be greater than 0".into());
        }
        if self.retry.attempts == 0 {
            push("retry.attempts", "must be greater than 0".into());
        }

        // --- sharing ---
        for name in &self.sharing.managed_roots {
            if name.contains('/') || name == "." || name == ".." {
                push(
                    "sharing.managed_roots",
                    format!("'{name}' must be a single directory name"),
                );
            }
        }

        // --- personal_roots ---
        let photos_root = self.personal_photos_root();
        for (index, entry) in self.personal_roots.iter().enumerate() {
            let field = format!("personal_roots[{index}].path");
            match resolve_personal_path(&photos_root, &entry.path) {
                Ok(_) => {}
                Err(message) => push(&field, message),
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            push(
                "logging.format",
                format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            );
        }

        errors
    }
}

/// Resolves a personal root path against the Photos folder.
///
/// Returns the virtual path below the Photos folder. The result must lie
/// strictly inside it.
pub fn resolve_personal_path(photos_root: &Path, raw: &str) -> Result<IndexPath, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("must not be empty".into());
    }
    let relative = if Path::new(raw).is_absolute() {
        match Path::new(raw).strip_prefix(photos_root) {
            Ok(rest) => rest.to_string_lossy().into_owned(),
            Err(_) => {
                return Err(format!(
                    "'{raw}' is not inside {}",
                    photos_root.display()
                ))
            }
        }
    } else {
        raw.to_string()
    };
    let path = IndexPath::parse_relative(&relative).map_err(|e| e.to_string())?;
    if path.is_root() {
        return Err("must name a subfolder, not the Photos folder itself".into());
    }
    Ok(path)
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use albumsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .dsm_host("nas.local")
///     .dsm_username("alice")
///     .indexing_wait_attempts(3)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- dsm ---

    pub fn dsm_host(mut self, host: impl Into<String>) -> Self {
        self.config.dsm.host = host.into();
        self
    }

    pub fn dsm_port(mut self, port: u16) -> Self {
        self.config.dsm.port = port;
        self
    }

    pub fn dsm_username(mut self, username: impl Into<String>) -> Self {
        self.config.dsm.username = username.into();
        self
    }

    // --- paths ---

    pub fn personal_homes_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.personal_homes_root = path.into();
        self
    }

    pub fn shared_photo_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.shared_photo_root = path.into();
        self
    }

    // --- mounts / media ---

    pub fn mounts_enabled(mut self, enabled: bool) -> Self {
        self.config.mounts.enabled = enabled;
        self
    }

    pub fn media_scan_max_depth(mut self, depth: i64) -> Self {
        self.config.media.scan_max_depth = depth;
        self
    }

    // --- indexing ---

    pub fn indexing_wait_attempts(mut self, attempts: u32) -> Self {
        self.config.indexing.wait_attempts = attempts;
        self
    }

    pub fn indexing_wait_delay_secs(mut self, seconds: u64) -> Self {
        self.config.indexing.wait_delay_secs = seconds;
        self
    }

    pub fn indexing_reindex_policy(mut self, policy: ReindexPolicy) -> Self {
        self.config.indexing.reindex_policy = policy;
        self
    }

    pub fn indexing_settle_secs(mut self, seconds: u64) -> Self {
        self.config.indexing.settle_secs = seconds;
        self
    }

    pub fn indexing_force_reindex_on_start(mut self, force: bool) -> Self {
        self.config.indexing.force_reindex_on_start = force;
        self
    }

    // --- sharing ---

    pub fn managed_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sharing.managed_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn root_share_with<I, S>(mut self, root: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .sharing
            .root_share_with
            .insert(root.into(), targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_permission(mut self, permission: Permission) -> Self {
        self.config.sharing.default_permission = permission;
        self
    }

    pub fn enable_public_sharing(mut self, enabled: bool) -> Self {
        self.config.sharing.enable_public_sharing = enabled;
        self
    }

    pub fn personal_root(mut self, entry: PersonalRootConfig) -> Self {
        self.config.personal_roots.push(entry);
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
