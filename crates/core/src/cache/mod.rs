//! SQLite-backed generational response cache.
//!
//! This module provides a persistent cache of fetched responses using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named generations (`<cache_name>-<version>`) deleted wholesale on rotation
//! - Revisioned keys (`<url>?rev=<revision>`) for precached resources
//! - SHA-256 integrity verification of downloaded bytes
//! - Manifest-driven sweeping of stale entries

pub mod connection;
pub mod entries;
pub mod hash;
pub mod key;
pub mod migrations;
pub mod store;
pub mod sweep;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::{ContentVerifier, Sha256Verifier, sha256_hex};
pub use key::{generation_name, request_key, revisioned_key, split_revision};
pub use store::{CacheStore, Generation, StoredResponse};
pub use sweep::{SweepReport, sweep};
