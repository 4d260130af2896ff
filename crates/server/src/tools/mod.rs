//! MCP tool implementations.
//!
//! This module contains all tools exposed by the holonet server.

pub mod entity;
pub mod search;
pub mod statistics;

pub use entity::EntityParams;
pub use search::CatalogSearchParams;
pub use statistics::StatisticsParams;
