use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StateError;
use crate::model::{BlogNode, DiscoveryEdge, Strategy};
use crate::state::CrawlState;

/// Exported view of a crawl: accepted blogs only, newest post first,
/// plus the full citation graph. This is the artifact consumers read;
/// the checkpoint stays an engine-internal format.
#[derive(Debug, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub crawled_at: DateTime<Utc>,
    pub strategy: Strategy,
    pub total_processed: u64,
    pub total_accepted: u64,
    pub blogs: Vec<BlogNode>,
    pub edges: Vec<DiscoveryEdge>,
}

impl DiscoveryReport {
    pub fn from_state(state: &CrawlState) -> Self {
        let mut blogs: Vec<BlogNode> = state.accepted_nodes().cloned().collect();
        // Freshest content first; blogs without a dated post sink to the
        // end, ordered by domain for stable output.
        blogs.sort_by(|a, b| {
            let a_date = a.latest_post.as_ref().and_then(|p| p.published);
            let b_date = b.latest_post.as_ref().and_then(|p| p.published);
            b_date.cmp(&a_date).then_with(|| a.domain.cmp(&b.domain))
        });

        Self {
            crawled_at: state.timestamp,
            strategy: state.strategy,
            total_processed: state.total_processed,
            total_accepted: state.total_accepted,
            blogs,
            edges: state.edges.clone(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(self).map_err(|source| StateError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, body)?;
        info!(path = %path.display(), blogs = self.blogs.len(), "results exported");
        Ok(())
    }
}
