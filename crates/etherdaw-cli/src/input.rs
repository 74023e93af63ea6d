//! Score loading.

use anyhow::{Context, Result};
use etherdaw_spec::Score;
use std::fs;
use std::path::Path;

/// A parsed score plus the hash of its canonical form.
#[derive(Debug)]
pub struct LoadedScore {
    pub score: Score,
    pub hash: String,
}

/// Reads and parses a JSON score file.
pub fn load_score(path: &Path) -> Result<LoadedScore> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read score file: {}", path.display()))?;
    let score = Score::from_json(&text)
        .with_context(|| format!("Failed to parse score file: {}", path.display()))?;
    let hash = score
        .canonical_hash()
        .context("Failed to hash score")?;
    tracing::debug!(path = %path.display(), hash = %hash, "loaded score");
    Ok(LoadedScore { score, hash })
}
