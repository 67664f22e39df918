use anyhow::Context;
use clap::Parser;
use serde_json::json;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xtrends_core::domain::counts::{fetch_timestamps, CountsResponse, HOURLY_TAIL};
use xtrends_core::ingest::HttpJsonSearchProvider;
use xtrends_core::time::{bucket_counts, Granularity, UnsupportedGranularity};

#[derive(Debug, Parser)]
#[command(name = "xtrends_cli")]
struct Args {
    /// Search query, e.g. "rust lang:en". The 7-day date filter is appended.
    query: String,

    /// Bucket width: hour, day, or both.
    #[arg(long, default_value = "both")]
    granularity: Selection,

    /// Cap on fetched posts. Defaults to SNSCRAPE_MAX_TWEETS.
    #[arg(long)]
    max_posts: Option<usize>,

    /// Hourly buckets kept when printing both series.
    #[arg(long, default_value_t = HOURLY_TAIL)]
    hourly_tail: usize,

    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Both,
    One(Granularity),
}

impl FromStr for Selection {
    type Err = UnsupportedGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "both" {
            return Ok(Selection::Both);
        }
        s.parse().map(Selection::One)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = xtrends_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let query = args.query.trim();
    anyhow::ensure!(!query.is_empty(), "query must be non-empty");

    let max_posts = args.max_posts.unwrap_or(settings.max_posts);
    let provider = HttpJsonSearchProvider::from_settings(&settings)?;

    let now = chrono::Utc::now();
    let stamps = match fetch_timestamps(&provider, query, max_posts, now).await {
        Ok(stamps) => stamps,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
    };

    let out = match args.granularity {
        Selection::Both => serde_json::to_value(CountsResponse::from_timestamps(
            &stamps,
            now,
            args.hourly_tail,
        )?)?,
        Selection::One(granularity) => json!({
            "granularity": granularity.as_str(),
            "data": bucket_counts(&stamps, granularity, now)?,
        }),
    };

    let text = if args.pretty {
        serde_json::to_string_pretty(&out)
    } else {
        serde_json::to_string(&out)
    }
    .context("failed to encode counts")?;
    println!("{text}");

    tracing::info!(%query, timestamps = stamps.len(), max_posts, "counts printed");
    Ok(())
}

fn init_sentry(settings: &xtrends_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_both_granularities() {
        let args = Args::try_parse_from(["xtrends_cli", "rust"]).unwrap();
        assert_eq!(args.granularity, Selection::Both);
        assert_eq!(args.hourly_tail, 24);
        assert!(args.max_posts.is_none());
    }

    #[test]
    fn accepts_single_granularity() {
        let args =
            Args::try_parse_from(["xtrends_cli", "rust", "--granularity", "day", "--max-posts", "50"])
                .unwrap();
        assert_eq!(args.granularity, Selection::One(Granularity::Day));
        assert_eq!(args.max_posts, Some(50));
    }

    #[test]
    fn rejects_unknown_granularity() {
        let err = Args::try_parse_from(["xtrends_cli", "rust", "--granularity", "week"]).unwrap_err();
        assert!(err.to_string().contains("week"));
    }
}
