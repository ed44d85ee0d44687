use std::fmt;
use std::str::FromStr;

use blogmap_crawler::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Queue ordering policy. Decided at pop time; pushes never reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// FIFO: all depth-N candidates before any depth-(N+1) candidate.
    BreadthFirst,
    /// LIFO: chase the most recent discovery down one branch.
    DepthFirst,
    /// Uniform-random pick among queued entries on every pop.
    Random,
    /// Coin flip between FIFO and LIFO on every pop.
    Mixed,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::BreadthFirst => "breadth-first",
            Strategy::DepthFirst => "depth-first",
            Strategy::Random => "random",
            Strategy::Mixed => "mixed",
        }
    }

    pub const ALL: [Strategy; 4] = [
        Strategy::BreadthFirst,
        Strategy::DepthFirst,
        Strategy::Random,
        Strategy::Mixed,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "breadth-first" => Ok(Strategy::BreadthFirst),
            "depth-first" => Ok(Strategy::DepthFirst),
            "random" => Ok(Strategy::Random),
            "mixed" => Ok(Strategy::Mixed),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Lifecycle of a blog node. `Queued`, `Validating` and `Fetching` are
/// transient; the other three are terminal for the lifetime of a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Queued,
    Validating,
    Fetching,
    Accepted,
    /// Failed a validation gate. Never retried.
    Rejected,
    /// Network or parse failure. Terminal for this run, but eligible for
    /// re-queue on a later run.
    Error,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Accepted | NodeStatus::Rejected | NodeStatus::Error)
    }
}

/// Why a candidate was rejected or errored out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    DisallowedTld,
    SkipListed,
    UnsafeUrl,
    BlacklistedBaseDomain,
    RobotsDisallowed,
    Unreachable,
    NoFeed,
    NoBlogIndicators,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::DisallowedTld => "disallowed_tld",
            RejectReason::SkipListed => "skip_listed",
            RejectReason::UnsafeUrl => "unsafe_url",
            RejectReason::BlacklistedBaseDomain => "blacklisted_base_domain",
            RejectReason::RobotsDisallowed => "robots_disallowed",
            RejectReason::Unreachable => "unreachable",
            RejectReason::NoFeed => "no_feed",
            RejectReason::NoBlogIndicators => "no_blog_indicators",
        }
    }
}

/// Where a blog was discovered: the citing blog and post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySource {
    pub source_blog: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_blog_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post_link: Option<String>,
}

/// The newest post seen on an accepted blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub title: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,
}

/// One node in the discovery graph, keyed by normalized domain.
/// Created when first referenced; mutated only by the engine; never
/// deleted, only marked terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogNode {
    pub domain: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub depth: u32,
    pub discovered_at: DateTime<Utc>,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub feed_url: Option<String>,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rejection: Option<RejectReason>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub discovered_from: Option<DiscoverySource>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latest_post: Option<PostSummary>,
}

impl BlogNode {
    pub fn new(domain: String, url: String, depth: u32) -> Self {
        Self {
            domain,
            url,
            name: None,
            depth,
            discovered_at: Utc::now(),
            platform: Platform::Custom,
            feed_url: None,
            status: NodeStatus::Queued,
            rejection: None,
            discovered_from: None,
            latest_post: None,
        }
    }
}

/// A "who cites whom" edge. At most one per (source, target) pair; the
/// first citing post becomes the representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryEdge {
    pub source: String,
    pub target: String,
    pub via_post: String,
}

/// A pending candidate in the discovery queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub url: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent: Option<String>,
    pub depth: u32,
    /// Monotonic enqueue sequence, the FIFO/LIFO tie-break and the key
    /// for deterministic replay.
    pub seq: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_both_separators() {
        assert_eq!("breadth-first".parse::<Strategy>().unwrap(), Strategy::BreadthFirst);
        assert_eq!("breadth_first".parse::<Strategy>().unwrap(), Strategy::BreadthFirst);
        assert_eq!("DEPTH-FIRST".parse::<Strategy>().unwrap(), Strategy::DepthFirst);
        assert_eq!("random".parse::<Strategy>().unwrap(), Strategy::Random);
        assert_eq!("mixed".parse::<Strategy>().unwrap(), Strategy::Mixed);
    }

    #[test]
    fn unknown_strategy_is_a_config_error() {
        let err = "deepest-first".parse::<Strategy>().unwrap_err();
        assert!(err.to_string().contains("deepest-first"));
    }

    #[test]
    fn terminal_statuses() {
        assert!(NodeStatus::Accepted.is_terminal());
        assert!(NodeStatus::Rejected.is_terminal());
        assert!(NodeStatus::Error.is_terminal());
        assert!(!NodeStatus::Queued.is_terminal());
        assert!(!NodeStatus::Validating.is_terminal());
        assert!(!NodeStatus::Fetching.is_terminal());
    }
}
