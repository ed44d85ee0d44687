use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;

/// Read seed URLs from a text file: one URL per line, blank lines and
/// `#` comments skipped, order preserved. Bare domains are promoted to
/// `https://` URLs.
pub fn load_seeds(path: &Path) -> Result<Vec<String>, ConfigError> {
    let body = fs::read_to_string(path).map_err(|source| ConfigError::SeedFile {
        path: path.to_path_buf(),
        source,
    })?;

    let mut seeds = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let url = if line.starts_with("http://") || line.starts_with("https://") {
            line.to_string()
        } else {
            format!("https://{line}")
        };
        seeds.push(url);
    }

    if seeds.is_empty() {
        return Err(ConfigError::EmptySeeds(path.to_path_buf()));
    }
    debug!(count = seeds.len(), path = %path.display(), "loaded seeds");
    Ok(seeds)
}
