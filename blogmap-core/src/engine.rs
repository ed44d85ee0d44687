use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use blogmap_crawler::{FeedSource, Post, SiteStatus, Validator, Verdict, extract, validate};
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::error::StateError;
use crate::model::{DiscoverySource, NodeStatus, PostSummary, RejectReason, Strategy};
use crate::queue::DiscoveryQueue;
use crate::state::CrawlState;

/// Tunables for one discovery run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Stop once this many blogs have been accepted.
    pub max_blogs: u64,
    /// Posts read per accepted feed.
    pub max_posts: usize,
    /// Checkpoint after every N accepted blogs (and always on exit).
    pub checkpoint_interval: u64,
    pub strategy: Strategy,
    /// On resume, push `Error` nodes back into the queue for another try.
    pub requeue_errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_blogs: 250,
            max_posts: 20,
            checkpoint_interval: 5,
            strategy: Strategy::BreadthFirst,
            requeue_errors: false,
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    QueueExhausted,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub total_processed: u64,
    pub total_accepted: u64,
    pub queued_remaining: usize,
}

/// Progress notifications for a UI layer; the engine itself only logs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Processing { domain: String, depth: u32, queued: usize },
    Accepted { domain: String, name: String, total_accepted: u64 },
    Rejected { domain: String, reason: RejectReason },
    Checkpointed { total_accepted: u64 },
}

pub type ProgressFn = Box<dyn Fn(ProgressEvent) + Send>;

/// The crawl orchestrator: pops candidates, walks them through the
/// validation pipeline, accepts or rejects, expands the frontier from
/// accepted feeds and checkpoints along the way. Network access goes
/// through the [`FeedSource`] seam.
pub struct DiscoveryEngine<S: FeedSource> {
    source: S,
    config: EngineConfig,
    validator: Validator,
    state: CrawlState,
    queue: DiscoveryQueue,
    store: CheckpointStore,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressFn>,
    accepted_at_last_checkpoint: u64,
}

impl<S: FeedSource> DiscoveryEngine<S> {
    /// Start a fresh crawl with empty state.
    pub fn new(source: S, config: EngineConfig, store: CheckpointStore) -> Self {
        let state = CrawlState::new(config.strategy);
        let queue = DiscoveryQueue::new(config.strategy);
        Self::build(source, config, store, state, queue)
    }

    /// Continue from checkpointed state. The run's strategy comes from
    /// `config`, not from the checkpoint, so a resumed crawl can switch
    /// exploration order.
    pub fn resume(source: S, config: EngineConfig, store: CheckpointStore, mut state: CrawlState) -> Self {
        if config.requeue_errors {
            let entries = state.requeue_errors();
            if !entries.is_empty() {
                info!(count = entries.len(), "re-queued errored nodes");
            }
            state.queue.extend(entries);
        }
        state.strategy = config.strategy;
        let queue = DiscoveryQueue::from_entries(config.strategy, std::mem::take(&mut state.queue));
        Self::build(source, config, store, state, queue)
    }

    fn build(
        source: S,
        config: EngineConfig,
        store: CheckpointStore,
        state: CrawlState,
        queue: DiscoveryQueue,
    ) -> Self {
        let accepted = state.total_accepted;
        Self {
            source,
            config,
            validator: Validator::new(),
            state,
            queue,
            store,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
            accepted_at_last_checkpoint: accepted,
        }
    }

    /// Flag shared with signal handlers; setting it stops the run after
    /// the in-flight candidate finishes.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn set_progress(&mut self, progress: ProgressFn) {
        self.progress = Some(progress);
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Enqueue starting points at depth 0. Already-known domains are
    /// skipped, so seeding a resumed crawl is harmless.
    pub fn seed(&mut self, urls: &[String]) {
        for url in urls {
            let Some(domain) = validate::extract_domain(url) else {
                warn!(url, "seed is not a valid URL, skipping");
                continue;
            };
            if let Some(entry) = self.state.admit(url, &domain, None, 0, None) {
                self.queue.push(entry);
            }
        }
    }

    /// Run to completion: target reached, queue exhausted or cancelled.
    /// Always writes a final checkpoint before returning.
    pub async fn run(&mut self) -> Result<RunSummary, StateError> {
        let stop_reason = loop {
            if self.cancel.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if self.state.total_accepted >= self.config.max_blogs {
                break StopReason::TargetReached;
            }
            let Some(entry) = self.queue.pop() else {
                break StopReason::QueueExhausted;
            };

            // After a resume the queue can reference nodes that already
            // reached a terminal status; those are never re-processed.
            if self.state.status_of(&entry.domain) != Some(NodeStatus::Queued) {
                continue;
            }

            self.emit(ProgressEvent::Processing {
                domain: entry.domain.clone(),
                depth: entry.depth,
                queued: self.queue.len(),
            });

            self.process(&entry.url, &entry.domain, entry.depth).await;
            self.state.total_processed += 1;

            let accepted_since = self.state.total_accepted - self.accepted_at_last_checkpoint;
            if accepted_since >= self.config.checkpoint_interval {
                self.checkpoint()?;
            }
        };

        self.checkpoint()?;
        info!(
            ?stop_reason,
            processed = self.state.total_processed,
            accepted = self.state.total_accepted,
            "run finished"
        );
        Ok(RunSummary {
            stop_reason,
            total_processed: self.state.total_processed,
            total_accepted: self.state.total_accepted,
            queued_remaining: self.queue.len(),
        })
    }

    /// Walk one candidate through the pipeline: offline gates, base
    /// blacklist, robots.txt, probe, feed attempts, then accept with
    /// frontier expansion or reject/error.
    async fn process(&mut self, url: &str, domain: &str, depth: u32) {
        self.state.mark_validating(domain);

        match self.validator.check(url) {
            Verdict::Ok => {}
            Verdict::DisallowedTld => return self.reject(domain, RejectReason::DisallowedTld),
            Verdict::SkipListed => return self.reject(domain, RejectReason::SkipListed),
            Verdict::UnsafeUrl => return self.reject(domain, RejectReason::UnsafeUrl),
        }

        let base = validate::base_domain(domain);
        if self.state.is_blacklisted_base(&base) {
            return self.reject(domain, RejectReason::BlacklistedBaseDomain);
        }

        if !self.source.robots_allowed(url).await {
            return self.reject(domain, RejectReason::RobotsDisallowed);
        }

        self.state.mark_fetching(domain);
        let probe = self.source.probe(url).await;

        if probe.status == SiteStatus::Unreachable {
            self.maybe_blacklist_base(domain, &base);
            self.state.mark_error(domain, RejectReason::Unreachable);
            self.emit(ProgressEvent::Rejected {
                domain: domain.to_string(),
                reason: RejectReason::Unreachable,
            });
            return;
        }

        for feed_url in &probe.feed_candidates {
            match self.source.fetch_feed(feed_url, self.config.max_posts).await {
                Ok(posts) => {
                    self.accept(domain, depth, feed_url, probe.platform, posts);
                    return;
                }
                Err(err) => {
                    debug!(domain, feed_url, error = %err, "feed candidate failed");
                }
            }
        }

        // Reachable but no working feed. Sites that never looked like a
        // blog get the softer reason.
        let reason = if probe.status == SiteStatus::NoBlogIndicators {
            RejectReason::NoBlogIndicators
        } else {
            RejectReason::NoFeed
        };
        self.maybe_blacklist_base(domain, &base);
        self.reject(domain, reason);
    }

    /// Accept a blog and expand the frontier from its posts' outbound
    /// links.
    fn accept(
        &mut self,
        domain: &str,
        depth: u32,
        feed_url: &str,
        platform: blogmap_crawler::Platform,
        posts: Vec<Post>,
    ) {
        let name = posts
            .first()
            .map(|p| p.blog_title.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| domain.to_string());
        let latest_post = posts.first().map(|p| PostSummary {
            title: p.title.clone(),
            link: p.link.clone(),
            published: p.published,
            summary: p.summary.clone(),
        });

        self.state.mark_accepted(
            domain,
            name.clone(),
            feed_url.to_string(),
            platform,
            latest_post,
        );
        info!(domain, feed_url, posts = posts.len(), "accepted blog");
        self.emit(ProgressEvent::Accepted {
            domain: domain.to_string(),
            name: name.clone(),
            total_accepted: self.state.total_accepted,
        });

        for post in &posts {
            for link in extract::extract_blog_links(&post.content_html, &post.link, &self.validator)
            {
                let Some(target) = validate::extract_domain(&link) else {
                    continue;
                };
                if target == domain {
                    continue;
                }

                // Edges are recorded even for known targets; the graph
                // grows while the queue does not.
                self.state.record_edge(domain, &target, &post.link);

                if self.state.is_known(&target)
                    || self.state.is_blacklisted_base(&validate::base_domain(&target))
                {
                    continue;
                }
                let discovered_from = Some(DiscoverySource {
                    source_blog: domain.to_string(),
                    source_blog_name: Some(name.clone()),
                    post_title: Some(post.title.clone()),
                    post_link: Some(post.link.clone()),
                });
                if let Some(entry) =
                    self.state.admit(&link, &target, Some(domain), depth + 1, discovered_from)
                {
                    debug!(source = domain, target = %target, "queued discovery");
                    self.queue.push(entry);
                }
            }
        }
    }

    fn reject(&mut self, domain: &str, reason: RejectReason) {
        self.state.mark_rejected(domain, reason);
        debug!(domain, reason = reason.as_str(), "rejected");
        self.emit(ProgressEvent::Rejected {
            domain: domain.to_string(),
            reason,
        });
    }

    /// One failure anywhere under a major site's base domain rules out
    /// the whole base; failures on the bare domain itself do the same,
    /// since its subdomains share the same infrastructure.
    fn maybe_blacklist_base(&mut self, domain: &str, base: &str) {
        if self.validator.is_major_site(base) || domain == base {
            self.state.blacklist_base(base);
            debug!(base, "blacklisted base domain");
        }
    }

    fn checkpoint(&mut self) -> Result<(), StateError> {
        self.state.queue = self.queue.snapshot();
        self.state.timestamp = chrono::Utc::now();
        self.store.save(&self.state)?;
        self.accepted_at_last_checkpoint = self.state.total_accepted;
        debug!(
            accepted = self.state.total_accepted,
            queued = self.state.queue.len(),
            "checkpoint written"
        );
        self.emit(ProgressEvent::Checkpointed {
            total_accepted: self.state.total_accepted,
        });
        Ok(())
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }
}
