use crate::time::window::window_start;
use anyhow::Context;
use chrono::{DateTime, Duration, SecondsFormat, Timelike, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hour,
    Day,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }

    /// Width of one bucket.
    pub fn unit(self) -> Duration {
        match self {
            Granularity::Hour => Duration::hours(1),
            Granularity::Day => Duration::days(1),
        }
    }

    /// Bucket key for `ts`: the start of the UTC hour or day containing it.
    /// `None` only when that start is not representable.
    pub fn truncate(self, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Granularity::Hour => ts.with_nanosecond(0)?.with_second(0)?.with_minute(0),
            Granularity::Day => ts.date_naive().and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = UnsupportedGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            other => Err(UnsupportedGranularity(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedGranularity(pub String);

impl fmt::Display for UnsupportedGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "granularity must be 'hour' or 'day' (got {:?})", self.0)
    }
}

impl std::error::Error for UnsupportedGranularity {}

/// Half-open interval `[start, end)` with the number of posts created inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    #[serde(serialize_with = "serialize_rfc3339")]
    pub start: DateTime<Utc>,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub end: DateTime<Utc>,
    #[serde(rename = "tweet_count")]
    pub count: u64,
}

fn serialize_rfc3339<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, false))
}

#[derive(Debug, Default)]
struct Tally(HashMap<DateTime<Utc>, u64>);

impl Tally {
    fn record(&mut self, key: DateTime<Utc>) {
        *self.0.entry(key).or_default() += 1;
    }

    fn get(&self, key: &DateTime<Utc>) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }
}

/// Counts `timestamps` into contiguous buckets covering the seven days up to `now`.
///
/// The first bucket starts at the truncation of `now - 7 days`, the last at the
/// truncation of `now`. Empty buckets are emitted with a zero count; timestamps
/// whose key falls outside that range are not counted anywhere.
pub fn bucket_counts(
    timestamps: &[DateTime<Utc>],
    granularity: Granularity,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<Bucket>> {
    let unit = granularity.unit();

    let mut tally = Tally::default();
    for key in timestamps.iter().filter_map(|ts| granularity.truncate(*ts)) {
        tally.record(key);
    }

    let first = granularity
        .truncate(window_start(now))
        .with_context(|| format!("window start for {now} has no {granularity} bucket"))?;
    let last = granularity
        .truncate(now)
        .with_context(|| format!("{now} has no {granularity} bucket"))?;

    let mut out = Vec::new();
    let mut cur = first;
    while cur <= last {
        let end = cur + unit;
        out.push(Bucket {
            start: cur,
            end,
            count: tally.get(&cur),
        });
        cur = end;
    }

    Ok(out)
}

pub fn bucket_counts_now(
    timestamps: &[DateTime<Utc>],
    granularity: Granularity,
) -> anyhow::Result<Vec<Bucket>> {
    bucket_counts(timestamps, granularity, Utc::now())
}
