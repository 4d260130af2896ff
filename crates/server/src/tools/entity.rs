//! person_get and film_get tool implementations.
//!
//! Both return the hydrated upstream document: cross-references replaced by
//! `{id, url, title|name}` summaries and a top-level `id` added.

use holonet_client::CancellationToken;
use holonet_core::ResourceKind;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::upstream_failure;
use crate::state::AppState;

/// Input parameters for person_get and film_get.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntityParams {
    /// Numeric id of the person or film.
    pub id: u64,
}

pub async fn get_impl(
    state: &AppState, kind: ResourceKind, params: EntityParams, cancel: &CancellationToken,
) -> Result<CallToolResult, McpError> {
    let what = format!("{} {}", kind.cache_prefix(), params.id);
    let entity = state
        .hydrator
        .get(kind, params.id, cancel)
        .await
        .map_err(|e| upstream_failure(&what, e))?;

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&entity).unwrap_or_default(),
    )]))
}
