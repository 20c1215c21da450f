//! Durable cross-game player standings
//!
//! The ranking store is the second piece of shared state next to the room
//! registry and is locked independently of it: ranking reads and writes are
//! rare compared to per-room traffic and must not contend with it. The table
//! is loaded once before the server accepts connections and rewritten in
//! full after every finished game.

use log::{error, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct RankingStore {
    path: PathBuf,
    scores: Mutex<HashMap<String, u32>>,
}

impl RankingStore {
    /// Loads the table from disk. A missing file yields an empty store; a
    /// corrupt one is logged and also yields an empty store, so a damaged
    /// rankings file never prevents the server from starting.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let scores = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, u32>>(&raw) {
                Ok(scores) => {
                    info!("Loaded {} ranking entries from {}", scores.len(), path.display());
                    scores
                }
                Err(e) => {
                    warn!(
                        "Rankings file {} is corrupt ({}), starting with an empty table",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => {
                info!("No rankings file at {}, starting with an empty table", path.display());
                HashMap::new()
            }
        };

        Self {
            path,
            scores: Mutex::new(scores),
        }
    }

    /// Folds one finished game into the table and rewrites the file. Write
    /// failures are logged but never surfaced to players.
    pub async fn record_game(&self, results: &HashMap<String, u32>) {
        let mut scores = self.scores.lock().await;
        for (name, points) in results {
            let entry = scores.entry(name.clone()).or_insert(0);
            *entry = entry.saturating_add(*points);
        }

        match write_rankings(&self.path, &scores) {
            Ok(()) => info!("Rankings saved to {}", self.path.display()),
            Err(e) => error!("Failed to persist rankings to {}: {}", self.path.display(), e),
        }
    }

    /// All entries, highest score first; equal scores are ordered by name so
    /// the listing is deterministic.
    pub async fn sorted_rankings(&self) -> Vec<(String, u32)> {
        let scores = self.scores.lock().await;
        let mut entries: Vec<(String, u32)> =
            scores.iter().map(|(name, score)| (name.clone(), *score)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    pub async fn score_of(&self, name: &str) -> Option<u32> {
        self.scores.lock().await.get(name).copied()
    }
}

fn write_rankings(path: &Path, scores: &HashMap<String, u32>) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(scores)?;
    std::fs::write(path, json)?;
    Ok(())
}
