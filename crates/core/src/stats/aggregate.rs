//! Statistics aggregation over the search-query log.

use chrono::{Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

use crate::cache::entries::timestamp;
use crate::{CacheDb, Error, ResourceKind};

const TOP_LIMIT: i64 = 5;

/// One of the most frequent `(term, type)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TopQuery {
    pub term: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub count: u64,
    /// Share of all logged searches, 0-100 with 2 decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AverageResponseTime {
    pub milliseconds: f64,
    pub seconds: f64,
}

/// Hour of day (UTC) with its search count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PopularHour {
    pub hour: u8,
    pub count: u64,
    /// e.g. `"23:00 - 00:00"`
    pub time_range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TypeShare {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TotalSearches {
    pub all_time: u64,
    pub last_24_hours: u64,
    pub last_hour: u64,
}

/// All statistics as last computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StatisticsSnapshot {
    pub top_queries: Vec<TopQuery>,
    pub average_response_time: Option<AverageResponseTime>,
    pub popular_hours: Vec<PopularHour>,
    pub search_type_distribution: Vec<TypeShare>,
    pub total_searches: TotalSearches,
    /// RFC 3339 time of the latest computation, `None` before the first run.
    pub last_updated: Option<String>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { round_to(count as f64 / total as f64 * 100.0, 2) }
}

fn parse_kind(raw: &str) -> Result<ResourceKind, Error> {
    raw.parse()
        .map_err(|_| Error::Codec(format!("unknown search type in query log: {raw}")))
}

fn time_range(hour: u8) -> String {
    format!("{:02}:00 - {:02}:00", hour, (hour + 1) % 24)
}

fn count(conn: &rusqlite::Connection, sql: &str, since: Option<&str>) -> Result<u64, Error> {
    let n: i64 = match since {
        Some(since) => conn.query_row(sql, params![since], |row| row.get(0))?,
        None => conn.query_row(sql, [], |row| row.get(0))?,
    };
    Ok(n as u64)
}

fn top_queries(conn: &rusqlite::Connection, total: u64) -> Result<Vec<TopQuery>, Error> {
    let mut stmt = conn.prepare(
        "SELECT search_term, search_type, COUNT(*) AS count
         FROM search_queries
         GROUP BY search_term, search_type
         ORDER BY count DESC, search_term ASC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![TOP_LIMIT], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(term, kind, n)| {
            let n = n as u64;
            Ok(TopQuery { term, kind: parse_kind(&kind)?, count: n, percentage: percentage(n, total) })
        })
        .collect()
}

fn popular_hours(conn: &rusqlite::Connection) -> Result<Vec<PopularHour>, Error> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%H', created_at) AS INTEGER) AS hour, COUNT(*) AS count
         FROM search_queries
         GROUP BY hour
         ORDER BY count DESC, hour ASC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![TOP_LIMIT], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|(hour, n)| {
            let hour = hour.clamp(0, 23) as u8;
            PopularHour { hour, count: n as u64, time_range: time_range(hour) }
        })
        .collect())
}

fn type_distribution(conn: &rusqlite::Connection, total: u64) -> Result<Vec<TypeShare>, Error> {
    let mut stmt = conn.prepare(
        "SELECT search_type, COUNT(*) FROM search_queries GROUP BY search_type ORDER BY search_type",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(kind, n)| {
            let n = n as u64;
            Ok(TypeShare { kind: parse_kind(&kind)?, count: n, percentage: percentage(n, total) })
        })
        .collect()
}

impl CacheDb {
    /// Aggregate the query log and store every statistic.
    ///
    /// All statistics are written in one transaction with the same
    /// `computed_at`, and the freshly computed snapshot is returned.
    pub async fn compute_statistics(&self) -> Result<StatisticsSnapshot, Error> {
        let now = Utc::now();
        let computed_at = timestamp(now);
        let day_ago = timestamp(now - Duration::days(1));
        let hour_ago = timestamp(now - Duration::hours(1));

        self.conn
            .call(move |conn| -> Result<StatisticsSnapshot, Error> {
                let tx = conn.transaction()?;

                let total = count(&tx, "SELECT COUNT(*) FROM search_queries", None)?;

                let average_ms: Option<f64> =
                    tx.query_row("SELECT AVG(response_time) FROM search_queries", [], |row| row.get(0))?;
                let average_ms = average_ms.unwrap_or(0.0);

                let snapshot = StatisticsSnapshot {
                    top_queries: if total == 0 { Vec::new() } else { top_queries(&tx, total)? },
                    average_response_time: Some(AverageResponseTime {
                        milliseconds: round_to(average_ms, 2),
                        seconds: round_to(average_ms / 1000.0, 3),
                    }),
                    popular_hours: popular_hours(&tx)?,
                    search_type_distribution: if total == 0 { Vec::new() } else { type_distribution(&tx, total)? },
                    total_searches: TotalSearches {
                        all_time: total,
                        last_24_hours: count(
                            &tx,
                            "SELECT COUNT(*) FROM search_queries WHERE created_at >= ?1",
                            Some(day_ago.as_str()),
                        )?,
                        last_hour: count(
                            &tx,
                            "SELECT COUNT(*) FROM search_queries WHERE created_at >= ?1",
                            Some(hour_ago.as_str()),
                        )?,
                    },
                    last_updated: Some(computed_at.clone()),
                };

                let entries = [
                    ("top_queries", serde_json::to_string(&snapshot.top_queries)?),
                    ("average_response_time", serde_json::to_string(&snapshot.average_response_time)?),
                    ("popular_hours", serde_json::to_string(&snapshot.popular_hours)?),
                    ("search_type_distribution", serde_json::to_string(&snapshot.search_type_distribution)?),
                    ("total_searches", serde_json::to_string(&snapshot.total_searches)?),
                ];
                for (key, data) in entries {
                    tx.execute(
                        "INSERT INTO statistics (key, data, computed_at) VALUES (?1, ?2, ?3)
                        ON CONFLICT(key) DO UPDATE SET data = excluded.data, computed_at = excluded.computed_at",
                        params![key, data, computed_at],
                    )?;
                }

                tx.commit()?;
                Ok(snapshot)
            })
            .await
            .map_err(Error::from)
    }

    /// Read the statistics stored by the last [`CacheDb::compute_statistics`] run.
    ///
    /// Missing keys fall back to empty values.
    pub async fn get_statistics(&self) -> Result<StatisticsSnapshot, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<(String, String, String)>, Error> {
                let mut stmt = conn.prepare("SELECT key, data, computed_at FROM statistics")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        let mut snapshot = StatisticsSnapshot::default();
        for (key, data, computed_at) in rows {
            match key.as_str() {
                "top_queries" => snapshot.top_queries = serde_json::from_str(&data)?,
                "average_response_time" => snapshot.average_response_time = serde_json::from_str(&data)?,
                "popular_hours" => snapshot.popular_hours = serde_json::from_str(&data)?,
                "search_type_distribution" => snapshot.search_type_distribution = serde_json::from_str(&data)?,
                "total_searches" => snapshot.total_searches = serde_json::from_str(&data)?,
                other => tracing::debug!(key = other, "ignoring unknown statistic"),
            }
            if snapshot.last_updated.as_deref().is_none_or(|latest| computed_at.as_str() > latest) {
                snapshot.last_updated = Some(computed_at);
            }
        }

        Ok(snapshot)
    }
}
