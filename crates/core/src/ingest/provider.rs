use crate::config::{env_or, non_empty_env, Settings};
use crate::ingest::types::SearchPage;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PATH: &str = "/v1/search/posts";

/// Source of posts matching a search query, read one page at a time.
///
/// Pass `None` as the cursor for the first page and the previous page's
/// `next_cursor` afterwards.
#[async_trait::async_trait]
pub trait PostSearchClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_page(&self, query: &str, cursor: Option<&str>) -> Result<SearchPage>;
}

#[derive(Debug, Clone)]
pub struct HttpJsonSearchProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
}

impl HttpJsonSearchProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_search_provider_base_url()?.to_string();
        let api_key = settings.search_provider_api_key.clone();

        let timeout_secs = env_or("SEARCH_PROVIDER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        let path =
            non_empty_env("SEARCH_PROVIDER_PATH").unwrap_or_else(|| DEFAULT_PATH.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build search provider http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            path,
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl PostSearchClient for HttpJsonSearchProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_page(&self, query: &str, cursor: Option<&str>) -> Result<SearchPage> {
        let mut params = vec![("q", query)];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }

        let res = self
            .http
            .get(self.url())
            .headers(self.headers()?)
            .query(&params)
            .send()
            .await
            .context("search provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read search provider response")?;

        if !status.is_success() {
            anyhow::bail!("search provider HTTP {status}: {text}");
        }

        parse_page(&text)
    }
}

fn parse_page(text: &str) -> Result<SearchPage> {
    let raw_json = serde_json::from_str::<Value>(text)
        .with_context(|| format!("search provider response is not valid JSON: {text}"))?;
    serde_json::from_value::<SearchPage>(raw_json)
        .context("failed to parse search provider response into SearchPage")
}
