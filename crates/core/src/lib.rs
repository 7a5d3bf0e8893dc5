//! Core types and shared functionality for revcache.
//!
//! This crate provides:
//! - Generational response cache with SQLite backend
//! - Resource manifest and revisioned cache keys
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;

pub use cache::{CacheDb, CacheStore, Generation, StoredResponse, SweepReport};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::{ManifestEntry, ManifestSource, StaticManifest};
