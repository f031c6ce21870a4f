//! AlbumSync Core - Domain types, ports and configuration
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `Root`, `IndexPath`, `FolderIndexEntry`, `Album`, `ShareSpec`, reports
//! - **Port definitions** - Traits for adapters: `IAuthSession`, `IAlbumService`,
//!   `IMountPrimitive`, `IWebSharing`
//! - **Configuration** - YAML configuration with validation and a builder
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module holds plain data and derivation rules with no I/O.
//! Ports define trait interfaces that adapter crates implement; the
//! reconciliation engine in `albumsync-sync` drives them.

pub mod config;
pub mod domain;
pub mod ports;
