pub mod domain;
pub mod ingest;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::str::FromStr;

    pub const DEFAULT_MAX_POSTS: usize = 2000;
    pub const DEFAULT_PORT: u16 = 5000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub max_posts: usize,
        pub port: u16,
        pub sentry_dsn: Option<String>,
        pub search_provider_base_url: Option<String>,
        pub search_provider_api_key: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                max_posts: env_or("SNSCRAPE_MAX_TWEETS", DEFAULT_MAX_POSTS)?,
                port: env_or("PORT", DEFAULT_PORT)?,
                sentry_dsn: non_empty_env("SENTRY_DSN"),
                search_provider_base_url: non_empty_env("SEARCH_PROVIDER_BASE_URL"),
                search_provider_api_key: non_empty_env("SEARCH_PROVIDER_API_KEY"),
            })
        }

        pub fn require_search_provider_base_url(&self) -> anyhow::Result<&str> {
            self.search_provider_base_url
                .as_deref()
                .context("SEARCH_PROVIDER_BASE_URL is required")
        }
    }

    pub(crate) fn non_empty_env(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.trim().is_empty())
    }

    /// Reads `name` from the environment, falling back to `default` when unset.
    /// A value that is set but does not parse is an error.
    pub(crate) fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match non_empty_env(name) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{name} must be a valid number (got {raw:?})")),
            None => Ok(default),
        }
    }

}
