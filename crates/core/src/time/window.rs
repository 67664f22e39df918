use chrono::{DateTime, Duration, Utc};

/// Length of the trailing window every count covers.
pub const LOOKBACK_DAYS: i64 = 7;

const SEARCH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Start of the trailing window ending at `now`.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(LOOKBACK_DAYS)
}

/// Appends the `since:`/`until:` date filter to a raw search query.
///
/// The search syntax filters on dates only, so `until` is pushed one day past
/// `now` to keep today's posts in the result.
pub fn build_search_query(query: &str, now: DateTime<Utc>) -> String {
    let since = window_start(now).format(SEARCH_DATE_FORMAT);
    let until = (now + Duration::days(1)).format(SEARCH_DATE_FORMAT);
    format!("{query} since:{since} until:{until}")
}
