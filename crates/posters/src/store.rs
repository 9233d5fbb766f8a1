//! File-backed poster cache.
//!
//! The whole cache is one JSON document. Mutations run read-merge-write under
//! a store-wide lock and commit by renaming a temp file over the original, so
//! readers never observe a half-written file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use mirrorlens_core::types::{FreshPoster, SliderItem};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosterCacheEntry {
    pub id: String,
    pub poster: String,
    #[serde(rename = "cate", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub seen: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterCache {
    #[serde(default)]
    pub slider: Vec<SliderItem>,
    /// Unique by id, in feed order.
    #[serde(default)]
    pub items: Vec<PosterCacheEntry>,
    /// Unix epoch milliseconds of the last write; 0 if never written.
    #[serde(default)]
    pub last_updated: i64,
}

impl PosterCache {
    pub fn get(&self, id: &str) -> Option<&PosterCacheEntry> {
        self.items.iter().find(|e| e.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub cache: PosterCache,
    /// Entries that were not in the previous cache.
    pub new_count: usize,
}

pub struct PosterCacheStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl PosterCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current cache. Missing or corrupt storage reads as an empty cache.
    pub async fn load(&self) -> PosterCache {
        match read_cache(&self.path).await {
            Ok(Some(cache)) => cache,
            Ok(None) => {
                debug!(path = %self.path.display(), "no poster cache yet");
                PosterCache::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "poster cache unreadable, starting empty");
                PosterCache::default()
            }
        }
    }

    /// Replace the cached listing with `fresh`, deduplicated by id (first
    /// occurrence wins). An entry is `seen` iff its id was already cached.
    pub async fn refresh(&self, slider: Vec<SliderItem>, fresh: Vec<FreshPoster>) -> RefreshOutcome {
        let _guard = self.write_lock.lock().await;

        let prior = self.load().await;
        let known: HashSet<&str> = prior.items.iter().map(|e| e.id.as_str()).collect();

        let mut taken = HashSet::new();
        let items: Vec<PosterCacheEntry> = fresh
            .into_iter()
            .filter(|p| taken.insert(p.id.clone()))
            .map(|p| PosterCacheEntry {
                seen: known.contains(p.id.as_str()),
                id: p.id,
                poster: p.poster,
                category: p.category,
            })
            .collect();

        let new_count = items.iter().filter(|e| !e.seen).count();
        let cache = PosterCache {
            slider,
            items,
            last_updated: chrono::Utc::now().timestamp_millis(),
        };
        self.commit(&cache).await;

        info!(items = cache.items.len(), new_count, "poster cache refreshed");
        RefreshOutcome { cache, new_count }
    }

    /// Force `seen = true` for the given ids. Other entries keep their flag
    /// and nothing is removed.
    pub async fn mark_seen(&self, ids: &[String]) -> PosterCache {
        let _guard = self.write_lock.lock().await;

        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut cache = self.load().await;
        let mut marked = 0usize;
        for entry in cache.items.iter_mut() {
            if wanted.contains(entry.id.as_str()) && !entry.seen {
                entry.seen = true;
                marked += 1;
            }
        }
        cache.last_updated = chrono::Utc::now().timestamp_millis();
        self.commit(&cache).await;

        debug!(requested = ids.len(), marked, "posters marked seen");
        cache
    }

    async fn commit(&self, cache: &PosterCache) {
        if let Err(e) = write_cache(&self.path, cache).await {
            warn!(path = %self.path.display(), error = %e, "failed to persist poster cache");
        }
    }
}

async fn read_cache(path: &Path) -> Result<Option<PosterCache>, StorageError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&raw)?))
}

async fn write_cache(path: &Path, cache: &PosterCache) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let body = serde_json::to_vec_pretty(cache)?;
    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&tmp_path, &body).await?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}
