//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the reconciliation
//! engine depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IAuthSession`] - Login/logout against the photo service
//! - [`IAlbumService`] - Folder index, albums, primary sharing, reindexing
//! - [`IMountPrimitive`] - Bind mount and unmount
//! - [`IWebSharing`] - Passphrase-based fallback sharing

pub mod album_service;
pub mod auth_session;
pub mod mount_primitive;
pub mod web_sharing;

pub use album_service::{IAlbumService, IndexStatus, PrimaryShareOutcome, ReindexScope};
pub use auth_session::IAuthSession;
pub use mount_primitive::{IMountPrimitive, MountAvailability};
pub use web_sharing::{FallbackShare, IWebSharing, SharePolicyRef};
