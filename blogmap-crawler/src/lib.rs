//! Network-facing half of blogmap: feed discovery and parsing, outbound
//! link extraction, validation gates, robots.txt policy and per-domain
//! rate limiting. The crawl state machine lives in `blogmap-core`.

pub mod error;
pub mod extract;
pub mod fetch;
pub mod platform;
pub mod ratelimit;
pub mod robots;
pub mod validate;

pub use error::{FetchError, Result};
pub use fetch::{FeedSource, Fetcher, FetcherConfig, Post, ProbeResult, SiteStatus};
pub use platform::Platform;
pub use ratelimit::RateLimiter;
pub use validate::{Validator, Verdict};
