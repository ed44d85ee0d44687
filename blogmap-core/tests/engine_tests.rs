use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use blogmap_core::{
    CheckpointStore, DiscoveryEngine, EngineConfig, NodeStatus, RejectReason, StopReason, Strategy,
};
use blogmap_crawler::error::FetchError;
use blogmap_crawler::validate::extract_domain;
use blogmap_crawler::{FeedSource, Platform, Post, ProbeResult, SiteStatus};
use tempfile::TempDir;

/// Scripted stand-in for the network layer: a fixed map of domains to
/// behaviors, plus a probe log for asserting what the engine touched.
#[derive(Clone)]
struct ScriptedSource {
    sites: Arc<HashMap<String, Site>>,
    probes: Arc<Mutex<Vec<String>>>,
}

#[derive(Clone)]
struct Site {
    reachable: bool,
    robots_allowed: bool,
    posts: Option<Vec<Post>>,
}

impl ScriptedSource {
    fn new(sites: HashMap<String, Site>) -> Self {
        Self {
            sites: Arc::new(sites),
            probes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn probe_log(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

impl FeedSource for ScriptedSource {
    async fn probe(&self, url: &str) -> ProbeResult {
        let domain = extract_domain(url).unwrap();
        self.probes.lock().unwrap().push(domain.clone());
        match self.sites.get(&domain) {
            Some(site) if site.reachable => ProbeResult {
                status: if site.posts.is_some() {
                    SiteStatus::BlogIndicators
                } else {
                    SiteStatus::NoBlogIndicators
                },
                feed_candidates: vec![format!("https://{domain}/feed")],
                platform: Platform::Custom,
            },
            _ => ProbeResult::unreachable(),
        }
    }

    async fn fetch_feed(&self, feed_url: &str, max_posts: usize) -> Result<Vec<Post>, FetchError> {
        let domain = extract_domain(feed_url).unwrap();
        match self.sites.get(&domain).and_then(|s| s.posts.clone()) {
            Some(posts) => Ok(posts.into_iter().take(max_posts).collect()),
            None => Err(FetchError::EmptyFeed(feed_url.to_string())),
        }
    }

    async fn robots_allowed(&self, url: &str) -> bool {
        let domain = extract_domain(url).unwrap();
        self.sites.get(&domain).is_none_or(|s| s.robots_allowed)
    }
}

fn blog(posts: Vec<Post>) -> Site {
    Site {
        reachable: true,
        robots_allowed: true,
        posts: Some(posts),
    }
}

fn post(domain: &str, n: u32, cited: &[&str]) -> Post {
    let anchors: String = cited
        .iter()
        .map(|url| format!(r#"<a href="{url}">link</a> "#))
        .collect();
    Post {
        title: format!("Post {n}"),
        link: format!("https://{domain}/post/{n}"),
        published: None,
        summary: None,
        content_html: format!("<p>words {anchors}</p>"),
        blog_title: format!("{domain} blog"),
    }
}

fn config(strategy: Strategy, max_blogs: u64) -> EngineConfig {
    EngineConfig {
        max_blogs,
        strategy,
        ..Default::default()
    }
}

fn accepted_domains(state: &blogmap_core::CrawlState) -> HashSet<String> {
    state
        .nodes
        .values()
        .filter(|n| n.status == NodeStatus::Accepted)
        .map(|n| n.domain.clone())
        .collect()
}

#[tokio::test]
async fn citations_grow_the_graph_and_skip_listed_sites_stay_out() {
    let sites = HashMap::from([
        (
            "a.com".to_string(),
            blog(vec![post("a.com", 1, &["https://c.io/essay", "https://twitter.com/someone"])]),
        ),
        ("b.org".to_string(), blog(vec![post("b.org", 1, &[])])),
        ("c.io".to_string(), blog(vec![post("c.io", 1, &[])])),
    ]);
    let source = ScriptedSource::new(sites);

    let dir = TempDir::new().unwrap();
    let mut engine = DiscoveryEngine::new(
        source,
        config(Strategy::BreadthFirst, 100),
        CheckpointStore::new(dir.path()),
    );
    engine.seed(&["https://a.com".to_string(), "https://b.org".to_string()]);
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::QueueExhausted);
    let state = engine.state();
    assert_eq!(
        accepted_domains(state),
        HashSet::from(["a.com".to_string(), "b.org".to_string(), "c.io".to_string()])
    );
    assert!(!state.nodes.contains_key("twitter.com"));

    let edge = state
        .edges
        .iter()
        .find(|e| e.source == "a.com" && e.target == "c.io")
        .expect("citation edge recorded");
    assert_eq!(edge.via_post, "https://a.com/post/1");
}

#[tokio::test]
async fn target_reached_stops_with_remainder_checkpointed() {
    let sites = HashMap::from([
        ("a.com".to_string(), blog(vec![post("a.com", 1, &[])])),
        ("b.com".to_string(), blog(vec![post("b.com", 1, &[])])),
        ("c.com".to_string(), blog(vec![post("c.com", 1, &[])])),
    ]);
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());

    let mut engine = DiscoveryEngine::new(
        ScriptedSource::new(sites),
        config(Strategy::BreadthFirst, 2),
        store,
    );
    engine.seed(&[
        "https://a.com".to_string(),
        "https://b.com".to_string(),
        "https://c.com".to_string(),
    ]);
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::TargetReached);
    assert_eq!(summary.total_accepted, 2);
    assert_eq!(summary.queued_remaining, 1);

    // The third seed survives the shutdown checkpoint.
    let reloaded = CheckpointStore::new(dir.path()).load().unwrap();
    assert_eq!(reloaded.queue.len(), 1);
    assert_eq!(reloaded.queue[0].domain, "c.com");
    assert_eq!(reloaded.total_accepted, 2);
}

#[tokio::test]
async fn every_strategy_accepts_the_same_set() {
    let sites = HashMap::from([
        (
            "a.com".to_string(),
            blog(vec![post("a.com", 1, &["https://b.dev/", "https://c.io/"])]),
        ),
        ("b.dev".to_string(), blog(vec![post("b.dev", 1, &["https://d.me/"])])),
        ("c.io".to_string(), blog(vec![post("c.io", 1, &[])])),
        ("d.me".to_string(), blog(vec![post("d.me", 1, &[])])),
    ]);

    let mut seen: Vec<HashSet<String>> = Vec::new();
    for strategy in Strategy::ALL {
        let dir = TempDir::new().unwrap();
        let mut engine = DiscoveryEngine::new(
            ScriptedSource::new(sites.clone()),
            config(strategy, 100),
            CheckpointStore::new(dir.path()),
        );
        engine.seed(&["https://a.com".to_string()]);
        engine.run().await.unwrap();
        seen.push(accepted_domains(engine.state()));
    }

    for set in &seen[1..] {
        assert_eq!(set, &seen[0]);
    }
    assert_eq!(seen[0].len(), 4);
}

#[tokio::test]
async fn breadth_first_probes_shallow_before_deep_and_depth_first_descends() {
    let sites = HashMap::from([
        (
            "a.com".to_string(),
            blog(vec![post("a.com", 1, &["https://b.dev/", "https://c.io/"])]),
        ),
        ("b.dev".to_string(), blog(vec![post("b.dev", 1, &["https://d.me/"])])),
        ("c.io".to_string(), blog(vec![post("c.io", 1, &[])])),
        ("d.me".to_string(), blog(vec![post("d.me", 1, &[])])),
    ]);

    let bfs = ScriptedSource::new(sites.clone());
    let dir = TempDir::new().unwrap();
    let mut engine = DiscoveryEngine::new(
        bfs.clone(),
        config(Strategy::BreadthFirst, 100),
        CheckpointStore::new(dir.path()),
    );
    engine.seed(&["https://a.com".to_string()]);
    engine.run().await.unwrap();
    assert_eq!(bfs.probe_log(), vec!["a.com", "b.dev", "c.io", "d.me"]);

    let dfs = ScriptedSource::new(sites);
    let dir = TempDir::new().unwrap();
    let mut engine = DiscoveryEngine::new(
        dfs.clone(),
        config(Strategy::DepthFirst, 100),
        CheckpointStore::new(dir.path()),
    );
    engine.seed(&["https://a.com".to_string()]);
    engine.run().await.unwrap();
    // b.dev and c.io are pushed in citation order; depth-first takes the
    // newest branch (c.io) first, then descends through b.dev into d.me.
    assert_eq!(dfs.probe_log(), vec!["a.com", "c.io", "b.dev", "d.me"]);
}

#[tokio::test]
async fn resume_never_reprobes_terminal_domains() {
    let sites = HashMap::from([
        ("a.com".to_string(), blog(vec![post("a.com", 1, &[])])),
        ("b.org".to_string(), blog(vec![post("b.org", 1, &[])])),
    ]);
    let seeds = vec!["https://a.com".to_string(), "https://b.org".to_string()];
    let dir = TempDir::new().unwrap();

    let mut engine = DiscoveryEngine::new(
        ScriptedSource::new(sites.clone()),
        config(Strategy::BreadthFirst, 100),
        CheckpointStore::new(dir.path()),
    );
    engine.seed(&seeds);
    engine.run().await.unwrap();

    let state = CheckpointStore::new(dir.path()).load().unwrap();
    let source = ScriptedSource::new(sites);
    let mut engine = DiscoveryEngine::resume(
        source.clone(),
        config(Strategy::BreadthFirst, 100),
        CheckpointStore::new(dir.path()),
        state,
    );
    // Re-seeding with known domains is a no-op.
    engine.seed(&seeds);
    let summary = engine.run().await.unwrap();

    assert!(source.probe_log().is_empty());
    assert_eq!(summary.total_accepted, 2);
}

#[tokio::test]
async fn robots_disallow_rejects_before_any_probe() {
    let sites = HashMap::from([(
        "a.com".to_string(),
        Site {
            reachable: true,
            robots_allowed: false,
            posts: Some(vec![post("a.com", 1, &[])]),
        },
    )]);
    let source = ScriptedSource::new(sites);

    let dir = TempDir::new().unwrap();
    let mut engine = DiscoveryEngine::new(
        source.clone(),
        config(Strategy::BreadthFirst, 100),
        CheckpointStore::new(dir.path()),
    );
    engine.seed(&["https://a.com".to_string()]);
    engine.run().await.unwrap();

    assert!(source.probe_log().is_empty());
    let node = &engine.state().nodes["a.com"];
    assert_eq!(node.status, NodeStatus::Rejected);
    assert_eq!(node.rejection, Some(RejectReason::RobotsDisallowed));
}

#[tokio::test]
async fn bare_domain_failure_blacklists_its_subdomains() {
    // example.com is unreachable; blog.example.com would work, but the
    // base-domain blacklist rules it out without a probe.
    let sites = HashMap::from([(
        "blog.example.com".to_string(),
        blog(vec![post("blog.example.com", 1, &[])]),
    )]);
    let source = ScriptedSource::new(sites);

    let dir = TempDir::new().unwrap();
    let mut engine = DiscoveryEngine::new(
        source.clone(),
        config(Strategy::BreadthFirst, 100),
        CheckpointStore::new(dir.path()),
    );
    engine.seed(&[
        "https://example.com".to_string(),
        "https://blog.example.com".to_string(),
    ]);
    engine.run().await.unwrap();

    assert_eq!(source.probe_log(), vec!["example.com"]);
    let state = engine.state();
    assert_eq!(state.nodes["example.com"].status, NodeStatus::Error);
    assert_eq!(
        state.nodes["blog.example.com"].rejection,
        Some(RejectReason::BlacklistedBaseDomain)
    );
}

#[tokio::test]
async fn reachable_site_without_feed_is_rejected_not_errored() {
    let sites = HashMap::from([(
        "a.com".to_string(),
        Site {
            reachable: true,
            robots_allowed: true,
            posts: None,
        },
    )]);
    let dir = TempDir::new().unwrap();
    let mut engine = DiscoveryEngine::new(
        ScriptedSource::new(sites),
        config(Strategy::BreadthFirst, 100),
        CheckpointStore::new(dir.path()),
    );
    engine.seed(&["https://a.com".to_string()]);
    engine.run().await.unwrap();

    let node = &engine.state().nodes["a.com"];
    assert_eq!(node.status, NodeStatus::Rejected);
    assert_eq!(node.rejection, Some(RejectReason::NoBlogIndicators));
}
