//! catalog_search tool implementation.
//!
//! Validates the query, searches the upstream catalog and logs the search
//! with its result count and response time.

use std::time::Instant;

use holonet_client::{CancellationToken, SearchQuery};
use holonet_core::SearchRecord;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::upstream_failure;
use crate::state::AppState;

/// Input parameters for catalog_search.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogSearchParams {
    /// Search term: 1-100 letters, digits, spaces or hyphens.
    pub query: String,

    /// What to search: "people" or "films".
    #[serde(rename = "type")]
    pub kind: String,
}

/// Output of catalog_search.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogSearchOutput {
    pub success: bool,
    /// Upstream search response with an `id` on every listed entity.
    pub data: Value,
    /// Upstream round-trip in milliseconds, 2 decimals.
    pub response_time: f64,
}

pub async fn search_impl(
    state: &AppState, params: CatalogSearchParams, cancel: &CancellationToken,
) -> Result<CallToolResult, McpError> {
    let query = SearchQuery::parse(&params.query, &params.kind)?;

    let started = Instant::now();
    let results = state
        .gateway
        .run(&query, cancel)
        .await
        .map_err(|e| upstream_failure(&format!("{} search", query.kind), e))?;
    let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    let record = SearchRecord::now(query.term.clone(), query.kind, results.count(), response_time_ms);
    if let Err(error) = state.query_log.record(record).await {
        tracing::warn!(term = %query.term, %error, "failed to log search");
    }

    let output = CatalogSearchOutput {
        success: true,
        data: results.with_ids(),
        response_time: (response_time_ms * 100.0).round() / 100.0,
    };

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}
