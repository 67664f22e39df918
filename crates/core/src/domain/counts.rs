use crate::ingest::{collect_post_timestamps, PostSearchClient};
use crate::time::{bucket_counts, build_search_query, Bucket, Granularity};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of hourly buckets returned to callers: the most recent day.
pub const HOURLY_TAIL: usize = 24;

#[derive(Debug, Clone, Serialize)]
pub struct CountsResponse {
    pub hourly: Vec<Bucket>,
    pub daily: Vec<Bucket>,
}

impl CountsResponse {
    /// Buckets `timestamps` both ways against the same `now`, keeping only the
    /// last `hourly_tail` hourly buckets.
    pub fn from_timestamps(
        timestamps: &[DateTime<Utc>],
        now: DateTime<Utc>,
        hourly_tail: usize,
    ) -> anyhow::Result<Self> {
        let mut hourly = bucket_counts(timestamps, Granularity::Hour, now)?;
        let daily = bucket_counts(timestamps, Granularity::Day, now)?;

        let skip = hourly.len().saturating_sub(hourly_tail);
        hourly.drain(..skip);

        Ok(Self { hourly, daily })
    }
}

/// Runs `query` with the trailing-window date filter and returns post timestamps.
pub async fn fetch_timestamps(
    client: &dyn PostSearchClient,
    query: &str,
    max_items: usize,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<DateTime<Utc>>> {
    let search_query = build_search_query(query, now);
    tracing::debug!(%search_query, max_items, "searching posts");
    collect_post_timestamps(client, &search_query, max_items).await
}

pub async fn compute_counts(
    client: &dyn PostSearchClient,
    query: &str,
    max_items: usize,
    now: DateTime<Utc>,
) -> anyhow::Result<CountsResponse> {
    let stamps = fetch_timestamps(client, query, max_items, now).await?;
    CountsResponse::from_timestamps(&stamps, now, HOURLY_TAIL)
}
