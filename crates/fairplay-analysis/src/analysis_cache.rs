//! On-disk cache of enhanced per-game analyses, keyed by player and PGN hash.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::quality::GameAnalysisV3;

const CACHE_FILE: &str = "analyses.json";

/// Analyses are seen from one player's side, so the (case-folded) username
/// is part of the key.
pub fn game_hash(pgn: &str, username: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.to_lowercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(pgn.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

pub struct AnalysisCache {
    path: PathBuf,
    entries: HashMap<String, GameAnalysisV3>,
}

impl AnalysisCache {
    /// Load `analyses.json` from `dir`. A missing or unreadable file starts empty.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(CACHE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Analysis cache unreadable, starting empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        debug!(path = %path.display(), entries = entries.len(), "Analysis cache loaded");
        Self { path, entries }
    }

    pub fn get(&self, hash: &str) -> Option<&GameAnalysisV3> {
        self.entries.get(hash)
    }

    pub fn insert(&mut self, analysis: GameAnalysisV3) {
        self.entries.insert(analysis.game_id.clone(), analysis);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<(), AnalysisError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(&self.entries)?)?;
        Ok(())
    }

    /// Drop every entry and delete the file. Returns how many were dropped.
    pub fn clear(&mut self) -> Result<usize, AnalysisError> {
        let dropped = self.entries.len();
        self.entries.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(dropped)
    }

    /// Write to disk, logging instead of failing.
    pub fn flush(&self) {
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), error = %e, "Failed to save analysis cache");
        }
    }
}
