use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::StateError;
use crate::state::CrawlState;

/// Archived checkpoints carry their accepted count in the filename, e.g.
/// `checkpoint_42_20260830T101500.json`. Only files with this prefix are
/// considered during fallback and nearest-match scans.
const ARCHIVE_PREFIX: &str = "checkpoint_";

/// Minimal view of a checkpoint file, enough to rank archives without
/// deserializing the whole node map.
#[derive(Deserialize)]
struct CheckpointPeek {
    total_accepted: u64,
}

/// Persists [`CrawlState`] snapshots as single JSON documents in a data
/// directory. Saves are atomic (write to a temp file, then rename) so a
/// crash mid-save can never destroy the previous checkpoint.
pub struct CheckpointStore {
    dir: PathBuf,
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join("checkpoint.json");
        Self { dir, path }
    }

    /// Store rooted at an explicit checkpoint file instead of the default
    /// name inside the data dir.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn save(&self, state: &CrawlState) -> Result<(), StateError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(state).map_err(|source| StateError::Corrupt {
            path: tmp.clone(),
            source,
        })?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Load exactly `path`, with no fallback. Used for `--checkpoint`.
    pub fn load_exact(path: &Path) -> Result<CrawlState, StateError> {
        if !path.is_file() {
            return Err(StateError::NotFound(path.to_path_buf()));
        }
        let body = fs::read(path)?;
        let mut state: CrawlState =
            serde_json::from_slice(&body).map_err(|source| StateError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
        state.rebuild_after_load();
        Ok(state)
    }

    /// Load the current checkpoint. If the file is corrupt, fall back to
    /// the newest valid archived checkpoint in the same directory rather
    /// than aborting; only when neither exists does this return an error.
    pub fn load(&self) -> Result<CrawlState, StateError> {
        match Self::load_exact(&self.path) {
            Ok(state) => Ok(state),
            Err(StateError::Corrupt { path, source }) => {
                warn!(path = %path.display(), error = %source, "checkpoint corrupt, trying archives");
                let mut archives = self.archived_files()?;
                // Newest last. Filenames alone sort by accepted count, so
                // order by modification time with the name as tie-break.
                archives.sort_by_key(|p| {
                    (fs::metadata(p).and_then(|m| m.modified()).ok(), p.clone())
                });
                for archive in archives.iter().rev() {
                    match Self::load_exact(archive) {
                        Ok(state) => {
                            info!(path = %archive.display(), "recovered from archived checkpoint");
                            return Ok(state);
                        }
                        Err(err) => {
                            warn!(path = %archive.display(), error = %err, "archive unusable");
                        }
                    }
                }
                Err(StateError::Corrupt { path, source })
            }
            Err(err) => Err(err),
        }
    }

    /// Among the current checkpoint and all archives, pick the one whose
    /// accepted count is closest to `target`. Ties go to the larger
    /// count. `None` when no readable checkpoint exists.
    pub fn find_nearest(&self, target: u64) -> Result<Option<PathBuf>, StateError> {
        let mut candidates = self.archived_files()?;
        if self.exists() {
            candidates.push(self.path.clone());
        }

        let mut best: Option<(u64, PathBuf)> = None;
        for path in candidates {
            let Ok(body) = fs::read(&path) else { continue };
            let Ok(peek) = serde_json::from_slice::<CheckpointPeek>(&body) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((count, _)) => {
                    let cur = count.abs_diff(target);
                    let new = peek.total_accepted.abs_diff(target);
                    new < cur || (new == cur && peek.total_accepted > *count)
                }
            };
            if better {
                best = Some((peek.total_accepted, path));
            }
        }
        Ok(best.map(|(_, path)| path))
    }

    /// Move the current checkpoint (and a results file beside it, if any)
    /// out of the way so the next run starts empty. The archive name
    /// records the accepted count for later `find_nearest` scans.
    pub fn archive(&self, results_path: Option<&Path>) -> Result<Option<PathBuf>, StateError> {
        if !self.exists() {
            return Ok(None);
        }
        let accepted = match fs::read(&self.path)
            .ok()
            .and_then(|body| serde_json::from_slice::<CheckpointPeek>(&body).ok())
        {
            Some(peek) => peek.total_accepted,
            None => 0,
        };
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let archived = self.dir.join(format!("{ARCHIVE_PREFIX}{accepted}_{stamp}.json"));
        fs::rename(&self.path, &archived)?;
        info!(path = %archived.display(), "archived previous checkpoint");

        if let Some(results) = results_path
            && results.is_file()
        {
            let archived_results = self
                .dir
                .join(format!("results_{accepted}_{stamp}.json"));
            fs::rename(results, archived_results)?;
        }
        Ok(Some(archived))
    }

    fn archived_files(&self) -> Result<Vec<PathBuf>, StateError> {
        let mut out = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(ARCHIVE_PREFIX) && name.ends_with(".json") {
                out.push(entry.path());
            }
        }
        Ok(out)
    }
}
