use crate::error::StoreError;
use core_types::EventRecord;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a loaded record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCard {
    pub path: PathBuf,
    /// On-disk size in bytes at load time.
    pub size: u64,
}

/// Records read from a folder, index-aligned with the cards they came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedBatch {
    pub records: Vec<EventRecord>,
    pub cards: Vec<StoredCard>,
    /// Files that were not a readable JSON object.
    pub skipped: Vec<PathBuf>,
}

impl LoadedBatch {
    /// On-disk card sizes keyed by record id, for the size-based policies.
    pub fn sizes_by_id(&self) -> HashMap<&str, u64> {
        self.records
            .iter()
            .zip(&self.cards)
            .map(|(r, c)| (r.id(), c.size))
            .collect()
    }
}

/// A folder of `*.json` fact cards, one event per file.
#[derive(Debug, Clone)]
pub struct CardStore {
    dir: PathBuf,
}

impl CardStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(StoreError::NotADirectory(dir));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Top-level `*.json` files, sorted by name. Sub-directories (the trash
    /// included) are not descended into.
    pub fn card_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"));
            if is_json && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Loads up to `limit` cards. A file that is not a JSON object is skipped
    /// with a warning, not treated as fatal.
    pub fn load(&self, limit: Option<usize>) -> Result<LoadedBatch, StoreError> {
        let mut paths = self.card_paths()?;
        if let Some(limit) = limit {
            paths.truncate(limit);
        }

        let mut batch = LoadedBatch::default();
        for path in paths {
            let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
            let document = match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    tracing::warn!(path = %path.display(), "Card is not a JSON object; skipping.");
                    batch.skipped.push(path);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Card is not valid JSON; skipping.");
                    batch.skipped.push(path);
                    continue;
                }
            };

            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            batch.records.push(EventRecord::from_document(id, document));
            batch.cards.push(StoredCard {
                size: bytes.len() as u64,
                path,
            });
        }

        tracing::info!(
            dir = %self.dir.display(),
            loaded = batch.records.len(),
            skipped = batch.skipped.len(),
            "Loaded fact cards."
        );
        Ok(batch)
    }

    /// Writes `record` back over the card it was loaded from.
    pub fn save(&self, card: &StoredCard, record: &EventRecord) -> Result<(), StoreError> {
        let mut text = serde_json::to_string_pretty(&record.to_document()).map_err(|e| StoreError::Json {
            path: card.path.clone(),
            source: e,
        })?;
        text.push('\n');
        fs::write(&card.path, text).map_err(|e| StoreError::io(&card.path, e))
    }

    /// Saves every record in `batch` in place.
    pub fn save_all(&self, batch: &LoadedBatch) -> Result<usize, StoreError> {
        for (record, card) in batch.records.iter().zip(&batch.cards) {
            self.save(card, record)?;
        }
        Ok(batch.records.len())
    }
}
