use std::path::PathBuf;
use thiserror::Error;

/// Failures around persisted crawl state.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("checkpoint IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt checkpoint {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no checkpoint found at {0}")]
    NotFound(PathBuf),
}

/// Startup configuration problems. These are fatal before any crawling
/// begins, unlike per-node failures which only downgrade one node.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "unknown queue strategy '{0}' (expected breadth-first, depth-first, random or mixed)"
    )]
    UnknownStrategy(String),

    #[error("seed file {path}: {source}")]
    SeedFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seed file {0} contains no usable URLs")]
    EmptySeeds(PathBuf),
}
