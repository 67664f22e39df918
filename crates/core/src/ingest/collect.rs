use crate::ingest::provider::PostSearchClient;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Pulls pages from `client` and returns the creation times of at most
/// `max_items` records.
///
/// Records without a timestamp are skipped but still count toward the cap.
/// Any page failure fails the whole collection.
pub async fn collect_post_timestamps(
    client: &dyn PostSearchClient,
    query: &str,
    max_items: usize,
) -> Result<Vec<DateTime<Utc>>> {
    let mut stamps = Vec::new();
    let mut seen: usize = 0;
    let mut pages: usize = 0;
    let mut cursor: Option<String> = None;

    while seen < max_items {
        let page = client
            .fetch_page(query, cursor.as_deref())
            .await
            .with_context(|| {
                format!(
                    "{} search failed after {seen} records",
                    client.provider_name()
                )
            })?;
        pages += 1;

        if page.items.is_empty() {
            break;
        }

        for record in page.items {
            if seen >= max_items {
                break;
            }
            seen += 1;
            if let Some(ts) = record.created_at {
                stamps.push(ts);
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    tracing::info!(
        provider = client.provider_name(),
        pages,
        records = seen,
        timestamps = stamps.len(),
        max_items,
        "search collection finished"
    );

    Ok(stamps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{PostRecord, SearchPage};
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    /// Serves pre-built pages in order, recording the cursors it was asked for.
    struct PagedFake {
        pages: Vec<Result<SearchPage, String>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl PagedFake {
        fn new(pages: Vec<Result<SearchPage, String>>) -> Self {
            Self {
                pages,
                cursors: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Option<String>> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl PostSearchClient for PagedFake {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_page(&self, _query: &str, cursor: Option<&str>) -> Result<SearchPage> {
            let mut calls = self.cursors.lock().unwrap();
            calls.push(cursor.map(str::to_string));
            match self.pages.get(calls.len() - 1) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(msg)) => Err(anyhow::anyhow!(msg.clone())),
                None => panic!("fetched past the last page"),
            }
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn page(n: usize, offset: i64, next: Option<&str>) -> SearchPage {
        SearchPage {
            items: (0..n)
                .map(|i| PostRecord {
                    id: Some(format!("{}", offset + i as i64)),
                    created_at: Some(base() + Duration::minutes(offset + i as i64)),
                })
                .collect(),
            next_cursor: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn follows_cursor_until_exhausted() {
        let fake = PagedFake::new(vec![
            Ok(page(3, 0, Some("p2"))),
            Ok(page(2, 3, None)),
        ]);

        let stamps = collect_post_timestamps(&fake, "rust", 100).await.unwrap();

        assert_eq!(stamps.len(), 5);
        assert_eq!(fake.calls(), vec![None, Some("p2".to_string())]);
    }

    #[tokio::test]
    async fn stops_at_cap_without_fetching_more() {
        let fake = PagedFake::new(vec![
            Ok(page(3, 0, Some("p2"))),
            Ok(page(3, 3, Some("p3"))),
        ]);

        let stamps = collect_post_timestamps(&fake, "rust", 4).await.unwrap();

        assert_eq!(stamps.len(), 4);
        assert_eq!(stamps[3], base() + Duration::minutes(3));
        assert_eq!(fake.calls().len(), 2);
    }

    #[tokio::test]
    async fn records_without_timestamp_consume_cap() {
        let mut first = page(2, 0, Some("p2"));
        first.items.insert(0, PostRecord::default());
        let fake = PagedFake::new(vec![Ok(first)]);

        let stamps = collect_post_timestamps(&fake, "rust", 2).await.unwrap();

        assert_eq!(stamps, vec![base()]);
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_page_ends_collection() {
        let fake = PagedFake::new(vec![Ok(SearchPage {
            items: vec![],
            next_cursor: Some("loop".to_string()),
        })]);

        let stamps = collect_post_timestamps(&fake, "rust", 10).await.unwrap();
        assert!(stamps.is_empty());
    }

    #[tokio::test]
    async fn zero_cap_fetches_nothing() {
        let fake = PagedFake::new(vec![]);
        let stamps = collect_post_timestamps(&fake, "rust", 0).await.unwrap();
        assert!(stamps.is_empty());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn mid_stream_failure_fails_collection() {
        let fake = PagedFake::new(vec![
            Ok(page(3, 0, Some("p2"))),
            Err("HTTP 429".to_string()),
        ]);

        let err = collect_post_timestamps(&fake, "rust", 100)
            .await
            .unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("after 3 records"));
        assert!(msg.contains("HTTP 429"));
    }
}
