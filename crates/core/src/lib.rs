//! Core types and shared functionality for holonet.
//!
//! This crate provides:
//! - Cache-aside store with in-memory and SQLite backends
//! - Search-query log and usage statistics
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod kind;
pub mod stats;

pub use cache::{CacheAside, CacheDb, CacheStore, MemoryCache};
pub use config::{AppConfig, CacheBackend, ConfigError};
pub use error::Error;
pub use kind::ResourceKind;
pub use stats::{QueryLog, SearchRecord, StatisticsSnapshot};
