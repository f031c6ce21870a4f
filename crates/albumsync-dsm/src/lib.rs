//! AlbumSync DSM - Synology DSM web API adapter
//!
//! Provides async adapters for:
//! - Session login/logout, including TOTP two-factor accounts
//! - The Synology Photos folder index, albums, sharing and reindexing
//! - The passphrase-link fallback used when condition albums refuse
//!   per-user sharing
//!
//! ## Modules
//!
//! - [`auth`] - `SYNO.API.Auth` session handling
//! - [`client`] - `/webapi/entry.cgi` HTTP client and envelope decoding
//! - [`photos`] - `IAlbumService` over `SYNO.Foto.*`
//! - [`sharing`] - `IWebSharing` over `SYNO.Foto.Sharing.Passphrase`

pub mod auth;
pub mod client;
pub mod photos;
pub mod sharing;

pub use auth::{Credentials, DsmAuthSession};
pub use client::DsmClient;
pub use photos::SynologyPhotos;
pub use sharing::SynologyWebSharing;
