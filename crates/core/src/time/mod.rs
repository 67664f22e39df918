pub mod buckets;
pub mod window;

pub use buckets::{bucket_counts, bucket_counts_now, Bucket, Granularity, UnsupportedGranularity};
pub use window::{build_search_query, LOOKBACK_DAYS};
