//! System mount primitive
//!
//! Drives `mount --bind` / `umount` through `tokio::process` and reads the
//! mount table from `/proc/mounts`.

use std::path::{Path, PathBuf};

use albumsync_core::domain::errors::MountError;
use albumsync_core::ports::{IMountPrimitive, MountAvailability};
use tokio::process::Command;
use tracing::{debug, info, warn};

const PROC_MOUNTS: &str = "/proc/mounts";

/// [`IMountPrimitive`] backed by the host's mount tooling
#[derive(Debug, Clone)]
pub struct SystemMountPrimitive {
    enabled: bool,
    mounts_file: PathBuf,
}

impl SystemMountPrimitive {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            mounts_file: PathBuf::from(PROC_MOUNTS),
        }
    }

    /// Reads the mount table from another file (tests)
    pub fn with_mounts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.mounts_file = path.into();
        self
    }

    async fn run(&self, program: &str, args: &[&std::ffi::OsStr]) -> Result<(), MountError> {
        let command_line = format!(
            "{program} {}",
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        debug!(command = %command_line, "Running mount command");

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| MountError::CommandFailed {
                command: command_line.clone(),
                status: None,
                stderr: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(MountError::CommandFailed {
                command: command_line,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait::async_trait]
impl IMountPrimitive for SystemMountPrimitive {
    fn availability(&self) -> MountAvailability {
        if !self.enabled {
            return MountAvailability::Unavailable("bind mounts disabled in configuration".into());
        }
        if !cfg!(target_os = "linux") {
            return MountAvailability::Unavailable("bind mounts require a Linux host".into());
        }
        for tool in ["mount", "umount"] {
            if find_in_path(tool).is_none() {
                return MountAvailability::Unavailable(format!("'{tool}' not found in PATH"));
            }
        }
        if !is_root() {
            return MountAvailability::Unavailable("bind mounts require root privileges".into());
        }
        MountAvailability::Available
    }

    async fn bind_mount(&self, source: &Path, target: &Path) -> Result<(), MountError> {
        self.run(
            "mount",
            &["--bind".as_ref(), source.as_os_str(), target.as_os_str()],
        )
        .await?;
        info!(source = %source.display(), target = %target.display(), "Bind mount created");
        Ok(())
    }

    async fn unmount(&self, target: &Path) -> Result<(), MountError> {
        match self.run("umount", &[target.as_os_str()]).await {
            Ok(()) => {}
            Err(MountError::CommandFailed { stderr, .. }) if stderr.to_lowercase().contains("busy") => {
                warn!(target = %target.display(), "Target busy, retrying with lazy unmount");
                self.run("umount", &["-l".as_ref(), target.as_os_str()])
                    .await?;
            }
            Err(err) => return Err(err),
        }
        info!(target = %target.display(), "Unmounted");
        Ok(())
    }

    async fn mounted_targets(&self) -> Result<Vec<PathBuf>, MountError> {
        let table = tokio::fs::read_to_string(&self.mounts_file)
            .await
            .map_err(|e| MountError::Io {
                path: self.mounts_file.clone(),
                message: e.to_string(),
            })?;
        Ok(parse_mount_table(&table))
    }

    async fn is_bound_to(&self, source: &Path, target: &Path) -> Result<bool, MountError> {
        if !self.is_mounted(target).await? {
            return Ok(false);
        }
        same_inode(source, target)
    }
}

/// Mount points listed in a `/proc/mounts`-style table
///
/// Octal escapes (`\040` for space and friends) are decoded.
pub fn parse_mount_table(table: &str) -> Vec<PathBuf> {
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(|field| PathBuf::from(decode_octal_escapes(field)))
        .collect()
}

fn decode_octal_escapes(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits
                    .iter()
                    .fold(0u16, |acc, b| acc * 8 + u16::from(b - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

#[cfg(unix)]
fn same_inode(source: &Path, target: &Path) -> Result<bool, MountError> {
    use std::os::unix::fs::MetadataExt;

    let stat = |path: &Path| {
        std::fs::metadata(path).map_err(|e| MountError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    };
    let (src, dst) = (stat(source)?, stat(target)?);
    Ok(src.dev() == dst.dev() && src.ino() == dst.ino())
}

#[cfg(not(unix))]
fn same_inode(_source: &Path, _target: &Path) -> Result<bool, MountError> {
    Err(MountError::Unsupported("non-unix host".into()))
}
