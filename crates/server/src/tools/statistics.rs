//! statistics_get tool implementation and the periodic refresh job.

use std::time::Duration;

use holonet_core::{CacheDb, StatisticsSnapshot};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// statistics_get takes no parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StatisticsParams {}

/// Returns the snapshot stored by the last refresh.
pub async fn statistics_impl(state: &AppState, _params: StatisticsParams) -> Result<CallToolResult, McpError> {
    let snapshot: StatisticsSnapshot = state.db.get_statistics().await?;

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&snapshot).unwrap_or_default(),
    )]))
}

/// Recompute statistics now and then every `every`, until aborted.
pub async fn refresh_loop(db: CacheDb, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match db.compute_statistics().await {
            Ok(snapshot) => tracing::debug!(total = snapshot.total_searches.all_time, "statistics refreshed"),
            Err(error) => tracing::warn!(%error, "statistics refresh failed"),
        }
    }
}
