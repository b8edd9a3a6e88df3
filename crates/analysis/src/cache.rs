//! Stage output cache
//!
//! Outputs live at `<basepath>/<stage_tag>/<key>.bin`. The key hashes the query
//! together with the records of the stage and everything upstream of it, so a
//! config change anywhere in the chain invalidates downstream entries.

use std::fs;
use std::path::{Path, PathBuf};

use contracts::{ContractError, Query};
use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::stage::{Stage, StageOutput};

/// On-disk store of stage outputs
#[derive(Debug, Clone)]
pub struct StageCache {
    root: PathBuf,
}

impl StageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of one entry
    pub fn entry_path(&self, tag: &str, key: &str) -> PathBuf {
        self.root.join(tag).join(format!("{key}.bin"))
    }

    /// Load an entry; unreadable entries count as misses
    pub fn load(&self, tag: &str, key: &str) -> Option<StageOutput> {
        let path = self.entry_path(tag, key);
        let bytes = fs::read(&path).ok()?;
        match bincode::deserialize(&bytes) {
            Ok(output) => Some(output),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache entry ignored");
                None
            }
        }
    }

    /// Store an entry, replacing any previous one
    pub fn store(&self, tag: &str, key: &str, output: &StageOutput) -> Result<(), ContractError> {
        let path = self.entry_path(tag, key);
        let dir = self.root.join(tag);
        fs::create_dir_all(&dir).map_err(|e| ContractError::path(&dir, e.to_string()))?;

        let bytes = bincode::serialize(output)
            .map_err(|e| ContractError::serialization(format!("cache entry: {e}")))?;
        let tmp = path.with_extension("bin.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Hash of the query and the chain of records ending at `stage`
pub fn cache_key<S: Stage + ?Sized>(stage: &S, query: &Query) -> Result<String, ContractError> {
    let mut hasher = blake3::Hasher::new();
    let query_bytes = bincode::serialize(query)
        .map_err(|e| ContractError::serialization(format!("cache key: {e}")))?;
    hasher.update(&query_bytes);

    let mut record = Some(stage.record()?);
    let mut upstream = stage.upstream();
    while let Some(current) = record {
        hasher.update(current.tag.as_bytes());
        hasher.update(&current.version.to_le_bytes());
        hasher.update(&current.config);
        record = match upstream {
            Some(up) => {
                let next = up.record()?;
                upstream = up.upstream();
                Some(next)
            }
            None => None,
        };
    }

    Ok(hasher.finalize().to_hex().to_string())
}

#[instrument(name = "stage_query", skip(stage, query), fields(stage = %stage.tag(), kicid = query.kicid))]
pub(crate) fn query_with_cache<S: Stage + ?Sized>(
    stage: &S,
    query: &Query,
) -> Result<StageOutput, ContractError> {
    let tag = stage.tag();
    let root = match stage.basepath() {
        Some(root) if stage.cache_enabled() => root,
        _ => return stage.compute(query),
    };

    let cache = StageCache::new(root);
    let key = cache_key(stage, query)?;

    if let Some(output) = cache.load(&tag, &key) {
        counter!("turnstile_stage_cache_hits_total", "stage" => tag.to_string()).increment(1);
        debug!(key = %key, "cache hit");
        return Ok(output);
    }

    counter!("turnstile_stage_cache_misses_total", "stage" => tag.to_string()).increment(1);
    let output = stage.compute(query)?;
    if let Err(e) = cache.store(&tag, &key, &output) {
        warn!(key = %key, error = %e, "failed to store cache entry");
    }
    Ok(output)
}
