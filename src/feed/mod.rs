//! Feed retrieval: the remote feed list and the feeds themselves.
//!
//! - [`list`] - client for the WordPress feed-list endpoint
//! - [`fetcher`] - per-feed retrieval and the bounded-concurrency
//!   collector that tolerates partial failure

pub mod fetcher;
pub mod list;

pub use fetcher::{collect_latest, fetch_latest, FetchError};
pub use list::{fetch_feed_list, FeedListError};
