use std::collections::{HashMap, HashSet};

use blogmap_crawler::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    BlogNode, DiscoveryEdge, DiscoverySource, NodeStatus, PostSummary, QueueEntry, RejectReason,
    Strategy,
};

/// The authoritative crawl record: every node ever referenced, the
/// citation edges, the pending queue, the base-domain blacklist and the
/// progress counters. Owned exclusively by the discovery engine; the
/// checkpoint store only serializes it.
#[derive(Debug, Serialize, Deserialize)]
pub struct CrawlState {
    pub timestamp: DateTime<Utc>,
    pub strategy: Strategy,
    pub nodes: HashMap<String, BlogNode>,
    pub edges: Vec<DiscoveryEdge>,
    /// Pending queue contents, in stored order.
    pub queue: Vec<QueueEntry>,
    pub blacklisted_base_domains: HashSet<String>,
    pub total_processed: u64,
    pub total_accepted: u64,
    next_seq: u64,
    #[serde(skip)]
    edge_seen: HashSet<(String, String)>,
}

impl CrawlState {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            timestamp: Utc::now(),
            strategy,
            nodes: HashMap::new(),
            edges: Vec::new(),
            queue: Vec::new(),
            blacklisted_base_domains: HashSet::new(),
            total_processed: 0,
            total_accepted: 0,
            next_seq: 0,
            edge_seen: HashSet::new(),
        }
    }

    /// Restore derived indexes after deserialization and roll any node
    /// that was in flight when the process stopped back to `Queued`, so
    /// a resumed crawl re-processes it instead of leaving it half-done.
    pub fn rebuild_after_load(&mut self) {
        self.edge_seen = self
            .edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect();

        let queued: HashSet<String> = self.queue.iter().map(|e| e.domain.clone()).collect();
        for node in self.nodes.values_mut() {
            if matches!(node.status, NodeStatus::Validating | NodeStatus::Fetching) {
                debug!(domain = %node.domain, "rolling in-flight node back to queued");
                node.status = NodeStatus::Queued;
            }
            // A queued node whose entry was lost would never be processed;
            // resurrect the entry.
            if node.status == NodeStatus::Queued && !queued.contains(node.domain.as_str()) {
                self.queue.push(QueueEntry {
                    url: node.url.clone(),
                    domain: node.domain.clone(),
                    parent: node.discovered_from.as_ref().map(|s| s.source_blog.clone()),
                    depth: node.depth,
                    seq: self.next_seq,
                });
                self.next_seq += 1;
            }
        }
    }

    /// Single-pass membership test: a domain with a node record (any
    /// status) is known and must never be re-enqueued.
    pub fn is_known(&self, domain: &str) -> bool {
        self.nodes.contains_key(domain)
    }

    pub fn is_blacklisted_base(&self, base_domain: &str) -> bool {
        self.blacklisted_base_domains.contains(base_domain)
    }

    pub fn blacklist_base(&mut self, base_domain: &str) {
        self.blacklisted_base_domains.insert(base_domain.to_string());
    }

    /// Register a new candidate node and hand back its queue entry.
    /// Returns `None` (a no-op) when the domain is already known.
    pub fn admit(
        &mut self,
        url: &str,
        domain: &str,
        parent: Option<&str>,
        depth: u32,
        discovered_from: Option<DiscoverySource>,
    ) -> Option<QueueEntry> {
        if self.is_known(domain) {
            return None;
        }

        let mut node = BlogNode::new(domain.to_string(), url.to_string(), depth);
        node.discovered_from = discovered_from;
        self.nodes.insert(domain.to_string(), node);

        let entry = QueueEntry {
            url: url.to_string(),
            domain: domain.to_string(),
            parent: parent.map(|p| p.to_string()),
            depth,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        Some(entry)
    }

    pub fn mark_validating(&mut self, domain: &str) {
        if let Some(node) = self.nodes.get_mut(domain) {
            node.status = NodeStatus::Validating;
        }
    }

    pub fn mark_fetching(&mut self, domain: &str) {
        if let Some(node) = self.nodes.get_mut(domain) {
            node.status = NodeStatus::Fetching;
        }
    }

    pub fn mark_rejected(&mut self, domain: &str, reason: RejectReason) {
        if let Some(node) = self.nodes.get_mut(domain) {
            node.status = NodeStatus::Rejected;
            node.rejection = Some(reason);
        }
    }

    pub fn mark_error(&mut self, domain: &str, reason: RejectReason) {
        if let Some(node) = self.nodes.get_mut(domain) {
            node.status = NodeStatus::Error;
            node.rejection = Some(reason);
        }
    }

    pub fn mark_accepted(
        &mut self,
        domain: &str,
        name: String,
        feed_url: String,
        platform: Platform,
        latest_post: Option<PostSummary>,
    ) {
        if let Some(node) = self.nodes.get_mut(domain) {
            node.status = NodeStatus::Accepted;
            node.name = Some(name);
            node.feed_url = Some(feed_url);
            node.platform = platform;
            node.latest_post = latest_post;
            node.rejection = None;
            self.total_accepted += 1;
        }
    }

    /// Record a citation edge. Collapses duplicates: only the first post
    /// citing a given (source, target) pair is kept.
    pub fn record_edge(&mut self, source: &str, target: &str, via_post: &str) -> bool {
        let key = (source.to_string(), target.to_string());
        if !self.edge_seen.insert(key) {
            return false;
        }
        self.edges.push(DiscoveryEdge {
            source: source.to_string(),
            target: target.to_string(),
            via_post: via_post.to_string(),
        });
        true
    }

    /// Pull every `Error` node back into the queue for another attempt.
    /// Explicit rejections stay terminal.
    pub fn requeue_errors(&mut self) -> Vec<QueueEntry> {
        let mut entries = Vec::new();
        let domains: Vec<String> = self
            .nodes
            .values()
            .filter(|n| n.status == NodeStatus::Error)
            .map(|n| n.domain.clone())
            .collect();
        for domain in domains {
            let (url, depth, parent) = {
                let node = self.nodes.get_mut(&domain).expect("domain collected above");
                node.status = NodeStatus::Queued;
                node.rejection = None;
                (
                    node.url.clone(),
                    node.depth,
                    node.discovered_from.as_ref().map(|s| s.source_blog.clone()),
                )
            };
            entries.push(QueueEntry {
                url,
                domain,
                parent,
                depth,
                seq: self.next_seq,
            });
            self.next_seq += 1;
        }
        entries
    }

    pub fn accepted_nodes(&self) -> impl Iterator<Item = &BlogNode> {
        self.nodes.values().filter(|n| n.status == NodeStatus::Accepted)
    }

    pub fn status_of(&self, domain: &str) -> Option<NodeStatus> {
        self.nodes.get(domain).map(|n| n.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_is_a_noop_for_known_domains() {
        let mut state = CrawlState::new(Strategy::BreadthFirst);
        let first = state.admit("https://a.com", "a.com", None, 0, None);
        assert!(first.is_some());
        assert_eq!(first.unwrap().seq, 0);

        // Terminal, in-flight or queued: never re-admitted.
        state.mark_rejected("a.com", RejectReason::SkipListed);
        assert!(state.admit("https://a.com", "a.com", None, 0, None).is_none());
        assert!(state.is_known("a.com"));
    }

    #[test]
    fn sequence_numbers_are_monotonic() {
        let mut state = CrawlState::new(Strategy::BreadthFirst);
        let a = state.admit("https://a.com", "a.com", None, 0, None).unwrap();
        let b = state.admit("https://b.com", "b.com", None, 0, None).unwrap();
        let c = state.admit("https://c.com", "c.com", Some("a.com"), 1, None).unwrap();
        assert!(a.seq < b.seq && b.seq < c.seq);
    }

    #[test]
    fn edges_collapse_per_source_target_pair() {
        let mut state = CrawlState::new(Strategy::BreadthFirst);
        assert!(state.record_edge("a.com", "b.com", "https://a.com/post/1"));
        assert!(!state.record_edge("a.com", "b.com", "https://a.com/post/2"));
        assert!(state.record_edge("b.com", "a.com", "https://b.com/post/9"));

        assert_eq!(state.edges.len(), 2);
        assert_eq!(state.edges[0].via_post, "https://a.com/post/1");
    }

    #[test]
    fn accepted_updates_counters_and_metadata() {
        let mut state = CrawlState::new(Strategy::BreadthFirst);
        state.admit("https://a.com", "a.com", None, 0, None);
        state.mark_accepted(
            "a.com",
            "A Blog".into(),
            "https://a.com/feed".into(),
            Platform::Custom,
            None,
        );
        assert_eq!(state.total_accepted, 1);
        let node = &state.nodes["a.com"];
        assert_eq!(node.status, NodeStatus::Accepted);
        assert_eq!(node.feed_url.as_deref(), Some("https://a.com/feed"));
    }

    #[test]
    fn requeue_errors_leaves_rejections_alone() {
        let mut state = CrawlState::new(Strategy::BreadthFirst);
        state.admit("https://a.com", "a.com", None, 0, None);
        state.admit("https://b.com", "b.com", None, 0, None);
        state.mark_error("a.com", RejectReason::Unreachable);
        state.mark_rejected("b.com", RejectReason::SkipListed);

        let entries = state.requeue_errors();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].domain, "a.com");
        assert_eq!(state.status_of("a.com"), Some(NodeStatus::Queued));
        assert_eq!(state.status_of("b.com"), Some(NodeStatus::Rejected));
    }

    #[test]
    fn rebuild_rolls_in_flight_nodes_back_to_queued() {
        let mut state = CrawlState::new(Strategy::BreadthFirst);
        state.admit("https://a.com", "a.com", None, 0, None);
        state.mark_validating("a.com");

        // Simulate a checkpoint taken mid-candidate: queue entry popped,
        // node not yet terminal.
        state.queue.clear();
        state.rebuild_after_load();

        assert_eq!(state.status_of("a.com"), Some(NodeStatus::Queued));
        assert_eq!(state.queue.len(), 1);
        assert_eq!(state.queue[0].domain, "a.com");
    }
}
