//! PipelineComposer - builds the fixed stage order
//!
//! Download → [Inject] → Prepare → Likelihood → 1-D search → 2-D search.
//! Inject is only present when the query carries an injected system.

use std::path::{Path, PathBuf};

use contracts::{CachePolicy, ContractError};
use tracing::{debug, instrument};

use crate::pipeline::Pipeline;
use crate::stage::{Stage, StageKind};
use crate::stages::{
    Inject, InjectStage, Likelihood, LikelihoodStage, OneDSearch, OneDSearchStage, Prepare,
    PrepareStage, PreparedDownload, TwoDSearch, TwoDSearchStage,
};

/// Tags of a full chain, root first
pub const CHAIN_ORDER: [&str; 6] = [
    PreparedDownload::TAG,
    Inject::TAG,
    Prepare::TAG,
    Likelihood::TAG,
    OneDSearch::TAG,
    TwoDSearch::TAG,
];

/// Check that `tags` follow [`CHAIN_ORDER`], with Inject optional.
///
/// # Errors
/// `Serialization` naming the offending chain.
pub fn check_chain_order(tags: &[&str]) -> Result<(), ContractError> {
    let without_inject = CHAIN_ORDER.iter().filter(|t| **t != Inject::TAG);
    if *tags == CHAIN_ORDER || tags.iter().eq(without_inject) {
        Ok(())
    } else {
        Err(ContractError::serialization(format!(
            "stage chain {tags:?} does not follow {CHAIN_ORDER:?}"
        )))
    }
}

/// Builder for the analysis chain of one target
#[derive(Debug, Clone)]
pub struct PipelineComposer {
    prepared_file: PathBuf,
    cache_root: PathBuf,
    injection: bool,
    cache: CachePolicy,
}

impl PipelineComposer {
    /// `prepared_file` is the manifest written by the download bootstrap;
    /// `cache_root` receives cached stage outputs.
    pub fn new(prepared_file: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            prepared_file: prepared_file.into(),
            cache_root: cache_root.into(),
            injection: false,
            cache: CachePolicy::default(),
        }
    }

    /// Include the injection stage
    pub fn with_injection(mut self, enabled: bool) -> Self {
        self.injection = enabled;
        self
    }

    pub fn cache_policy(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Compose the chain.
    ///
    /// # Errors
    /// `Configuration` when the prepared input does not exist yet.
    #[instrument(name = "compose_pipeline", skip(self), fields(injection = self.injection))]
    pub fn build(self) -> Result<Pipeline, ContractError> {
        require_file(&self.prepared_file)?;

        let mut stage: Box<dyn Stage> = Box::new(PreparedDownload::new(self.cache_root));
        if self.injection {
            stage = Box::new(InjectStage::new(stage, self.cache.inject));
        }
        stage = Box::new(PrepareStage::new(stage, self.cache.prepare));
        stage = Box::new(LikelihoodStage::new(stage, self.cache.likelihood));
        stage = Box::new(OneDSearchStage::new(stage, self.cache.one_d));
        stage = Box::new(TwoDSearchStage::new(stage, self.cache.two_d));

        let pipeline = Pipeline::new(stage);
        debug!(stages = pipeline.len(), "pipeline composed");
        Ok(pipeline)
    }
}

fn require_file(path: &Path) -> Result<(), ContractError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ContractError::configuration(
            "prepared_file",
            format!("'{}' does not exist", path.display()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn composer(dir: &Path) -> PipelineComposer {
        let manifest = dir.join("download.bin");
        fs::write(&manifest, b"").unwrap();
        PipelineComposer::new(manifest, dir.join("cache"))
    }

    #[test]
    fn test_chain_order_check() {
        assert!(check_chain_order(&CHAIN_ORDER).is_ok());
        assert!(check_chain_order(&[
            "download",
            "prepare",
            "likelihood",
            "one_d_search",
            "two_d_search"
        ])
        .is_ok());
        assert!(check_chain_order(&["download", "prepare", "two_d_search"]).is_err());
        assert!(check_chain_order(&[]).is_err());
    }

    #[test]
    fn test_chain_without_injection() {
        let dir = tempdir().unwrap();
        let pipeline = composer(dir.path()).build().unwrap();
        let tags: Vec<String> = pipeline.tags().iter().map(|t| t.to_string()).collect();
        assert_eq!(
            tags,
            vec!["download", "prepare", "likelihood", "one_d_search", "two_d_search"]
        );
        assert_eq!(pipeline.root().tag(), "download");
        assert!(pipeline.root().upstream().is_none());
        assert_eq!(pipeline.terminal().tag(), "two_d_search");
    }

    #[test]
    fn test_chain_with_injection() {
        let dir = tempdir().unwrap();
        let pipeline = composer(dir.path()).with_injection(true).build().unwrap();
        assert_eq!(pipeline.len(), 6);
        assert_eq!(pipeline.stages()[1].tag(), "inject");
    }

    #[test]
    fn test_default_cache_policy() {
        let dir = tempdir().unwrap();
        let pipeline = composer(dir.path()).with_injection(true).build().unwrap();
        let cached: Vec<bool> = pipeline.stages().iter().map(|s| s.cache_enabled()).collect();
        assert_eq!(cached, vec![false, false, false, false, true, false]);
    }

    #[test]
    fn test_missing_prepared_file() {
        let dir = tempdir().unwrap();
        let err = PipelineComposer::new(dir.path().join("missing.bin"), dir.path())
            .build()
            .unwrap_err();
        assert!(matches!(err, ContractError::Configuration { ref field, .. } if field == "prepared_file"));
    }
}
