//! Crawl state machine for blogmap: the discovery queue and its
//! strategies, the checkpointed crawl state, the results export and the
//! engine that drives the network layer in `blogmap-crawler`.

use colored::Colorize;

pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod export;
pub mod model;
pub mod queue;
pub mod seeds;
pub mod state;

pub use checkpoint::CheckpointStore;
pub use engine::{DiscoveryEngine, EngineConfig, ProgressEvent, RunSummary, StopReason};
pub use error::{ConfigError, StateError};
pub use export::DiscoveryReport;
pub use model::{BlogNode, DiscoveryEdge, NodeStatus, QueueEntry, RejectReason, Strategy};
pub use queue::DiscoveryQueue;
pub use seeds::load_seeds;
pub use state::CrawlState;

pub fn print_banner() {
    let banner = r#"
  _     _
 | |__ | | ___   __ _ _ __ ___   __ _ _ __
 | '_ \| |/ _ \ / _` | '_ ` _ \ / _` | '_ \
 | |_) | | (_) | (_| | | | | | | (_| | |_) |
 |_.__/|_|\___/ \__, |_| |_| |_|\__,_| .__/
                |___/                |_|
"#;
    for line in banner.lines() {
        println!("{}", line.cyan());
    }
    println!(
        " {} {}\n",
        "blog discovery crawler".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).green()
    );
}
