//! Client code for holonet.
//!
//! This crate talks to the upstream catalog: a retrying JSON transport, the
//! search gateway, and the hydrator that expands cross-references into
//! summaries through the cache-aside store.

pub mod hydrate;
pub mod resolve;
pub mod search;
pub mod transport;

pub use hydrate::{Entity, Hydrator, Summary};
pub use resolve::{canonical_url, id_from_url, kind_from_url};
pub use search::{SearchGateway, SearchQuery, SearchResults};
pub use transport::{Transport, TransportConfig, TransportError, Upstream};

pub use tokio_util::sync::CancellationToken;
