use crate::cards::StoredCard;
use crate::error::StoreError;
use dedupe::ResolutionOutcome;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// How discarded cards leave the folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashOptions {
    pub trash_dir_name: String,
    /// Also take sibling files sharing the card's stem, e.g. `1234.orig.txt`.
    pub include_related: bool,
    /// Delete instead of moving into the trash directory.
    pub remove: bool,
    /// Compute the plan without touching the file system.
    pub dry_run: bool,
}

impl Default for TrashOptions {
    fn default() -> Self {
        Self {
            trash_dir_name: "_dedup_trash".to_string(),
            include_related: true,
            remove: false,
            dry_run: false,
        }
    }
}

/// One file-system effect of a dedupe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TrashAction {
    Moved { from: PathBuf, to: PathBuf },
    Deleted { path: PathBuf },
    Planned { path: PathBuf },
}

/// Moves (or deletes) every discarded card and its related files.
///
/// Kept cards are never touched, even when they look related to a discard.
/// Trash names never overwrite: a clash becomes `name__1.json`, `name__2.json`.
pub fn apply_resolution(
    dir: &Path,
    cards: &[StoredCard],
    outcomes: &[ResolutionOutcome],
    options: &TrashOptions,
) -> Result<Vec<TrashAction>, StoreError> {
    let discarded: Vec<&StoredCard> = outcomes
        .iter()
        .flat_map(|o| &o.discarded)
        .map(|d| cards.get(d.index).ok_or(StoreError::UnknownCard(d.index)))
        .collect::<Result<_, _>>()?;

    let discarded_paths: HashSet<&Path> = discarded.iter().map(|c| c.path.as_path()).collect();
    let protected: HashSet<&Path> = cards
        .iter()
        .map(|c| c.path.as_path())
        .filter(|p| !discarded_paths.contains(p))
        .collect();

    let mut plan: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    for card in discarded {
        if seen.insert(card.path.clone()) {
            plan.push(card.path.clone());
        }
        if options.include_related {
            for sibling in related_files(&card.path)? {
                if !protected.contains(sibling.as_path()) && seen.insert(sibling.clone()) {
                    plan.push(sibling);
                }
            }
        }
    }

    if options.dry_run {
        return Ok(plan.into_iter().map(|path| TrashAction::Planned { path }).collect());
    }

    let trash_dir = dir.join(&options.trash_dir_name);
    if !options.remove && !plan.is_empty() {
        fs::create_dir_all(&trash_dir).map_err(|e| StoreError::io(&trash_dir, e))?;
    }

    let mut actions = Vec::with_capacity(plan.len());
    for path in plan {
        if !path.exists() {
            continue;
        }
        if options.remove {
            fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
            tracing::debug!(path = %path.display(), "Deleted duplicate.");
            actions.push(TrashAction::Deleted { path });
        } else {
            let to = free_name(&trash_dir, &path);
            fs::rename(&path, &to).map_err(|e| StoreError::io(&path, e))?;
            tracing::debug!(from = %path.display(), to = %to.display(), "Moved duplicate to trash.");
            actions.push(TrashAction::Moved { from: path, to });
        }
    }

    tracing::info!(files = actions.len(), remove = options.remove, "Applied dedupe verdicts.");
    Ok(actions)
}

/// Sibling files whose stem is the card's stem, its base before the first
/// dot, or either of those followed by a dot.
fn related_files(path: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let (Some(parent), Some(stem)) = (path.parent(), path.file_stem().and_then(|s| s.to_str())) else {
        return Ok(Vec::new());
    };
    let mut bases = vec![stem.to_string()];
    if let Some((base, _)) = stem.split_once('.') {
        bases.push(base.to_string());
    }

    let entries = fs::read_dir(parent).map_err(|e| StoreError::io(parent, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let candidate = entry.map_err(|e| StoreError::io(parent, e))?.path();
        if candidate == path || !candidate.is_file() {
            continue;
        }
        let Some(other) = candidate.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let related = bases
            .iter()
            .any(|b| other == b || other.strip_prefix(b.as_str()).is_some_and(|rest| rest.starts_with('.')));
        if related {
            out.push(candidate);
        }
    }
    out.sort();
    Ok(out)
}

fn free_name(trash_dir: &Path, path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let first = trash_dir.join(&name);
    if !first.exists() {
        return first;
    }
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|i| trash_dir.join(format!("{stem}__{i}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}
