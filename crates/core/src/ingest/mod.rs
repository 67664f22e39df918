pub mod collect;
pub mod provider;
pub mod types;

pub use collect::collect_post_timestamps;
pub use provider::{HttpJsonSearchProvider, PostSearchClient};
