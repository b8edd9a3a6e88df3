//! Stage abstraction
//!
//! A pipeline is a strictly linear chain: every stage except the root owns its
//! upstream stage, and querying a stage pulls from upstream first.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use contracts::{ContractError, Query, StageRecord, StageTag};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache;
use crate::lightcurve::LightCurve;

/// Depth time series for one trial duration
///
/// `curve.flux` holds depths (`1 - flux`), `curve.ivar` their weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthProfile {
    pub duration: f64,
    pub curve: LightCurve,
}

/// Candidate signal from the period search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub period: f64,
    pub t0: f64,
    pub duration: f64,
    pub depth: f64,
    /// `depth * sqrt(Σivar)` of the folded box
    pub snr: f64,
}

/// What a stage hands to the next one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub light_curves: Vec<LightCurve>,
    pub profiles: Vec<DepthProfile>,
    pub peaks: Vec<Peak>,
}

/// One link of an analysis chain
pub trait Stage: Send + Sync + fmt::Debug {
    /// Registry tag of this stage type
    fn tag(&self) -> StageTag;

    /// Whether outputs are reused across identical queries
    fn cache_enabled(&self) -> bool;

    /// The stage this one pulls from (`None` for the root)
    fn upstream(&self) -> Option<&dyn Stage>;

    /// Cache directory shared by the chain; set on the root
    fn basepath(&self) -> Option<&Path> {
        self.upstream().and_then(|u| u.basepath())
    }

    /// Serialized form of this link (tag, version, cache flag, config)
    fn record(&self) -> Result<StageRecord, ContractError>;

    /// Produce this stage's output, pulling from upstream as needed
    fn compute(&self, query: &Query) -> Result<StageOutput, ContractError>;

    /// Cache-aware entry point
    fn query(&self, query: &Query) -> Result<StageOutput, ContractError> {
        cache::query_with_cache(self, query)
    }
}

/// A non-root stage type: a tag, a config and a transformation
pub trait StageKind: Send + Sync + 'static {
    const TAG: &'static str;

    /// Bump when `Config`'s encoding changes
    const VERSION: u32 = 1;

    const CACHE_BY_DEFAULT: bool = false;

    type Config: Serialize + DeserializeOwned + Default + Clone + fmt::Debug + Send + Sync;

    fn run(
        config: &Self::Config,
        input: StageOutput,
        query: &Query,
    ) -> Result<StageOutput, ContractError>;
}

/// A stage of kind `K` wrapping its upstream stage
pub struct Link<K: StageKind> {
    upstream: Box<dyn Stage>,
    cache: bool,
    config: K::Config,
    _kind: PhantomData<K>,
}

impl<K: StageKind> Link<K> {
    /// Wrap `upstream` with the default config
    pub fn new(upstream: Box<dyn Stage>, cache: bool) -> Self {
        Self::with_config(upstream, cache, K::Config::default())
    }

    /// Wrap `upstream` using the kind's default cache policy
    pub fn with_default_cache(upstream: Box<dyn Stage>) -> Self {
        Self::new(upstream, K::CACHE_BY_DEFAULT)
    }

    pub fn with_config(upstream: Box<dyn Stage>, cache: bool, config: K::Config) -> Self {
        Self {
            upstream,
            cache,
            config,
            _kind: PhantomData,
        }
    }

    pub fn config(&self) -> &K::Config {
        &self.config
    }

    /// Rebuild a link from its record; used by the registry.
    pub fn from_record(
        upstream: Option<Box<dyn Stage>>,
        record: &StageRecord,
    ) -> Result<Box<dyn Stage>, ContractError> {
        check_version(record, K::VERSION)?;
        let upstream = upstream.ok_or_else(|| {
            ContractError::serialization(format!("stage '{}' needs an upstream stage", K::TAG))
        })?;
        let config: K::Config = decode_config(record)?;
        Ok(Box::new(Self::with_config(upstream, record.cache, config)))
    }
}

impl<K: StageKind> fmt::Debug for Link<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("tag", &K::TAG)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("upstream", &self.upstream)
            .finish()
    }
}

impl<K: StageKind> Stage for Link<K> {
    fn tag(&self) -> StageTag {
        StageTag::new(K::TAG)
    }

    fn cache_enabled(&self) -> bool {
        self.cache
    }

    fn upstream(&self) -> Option<&dyn Stage> {
        Some(self.upstream.as_ref())
    }

    fn record(&self) -> Result<StageRecord, ContractError> {
        encode_record(K::TAG, K::VERSION, self.cache, &self.config)
    }

    fn compute(&self, query: &Query) -> Result<StageOutput, ContractError> {
        let input = self.upstream.query(query)?;
        K::run(&self.config, input, query)
    }
}

pub(crate) fn encode_record<C: Serialize>(
    tag: &str,
    version: u32,
    cache: bool,
    config: &C,
) -> Result<StageRecord, ContractError> {
    let config = bincode::serialize(config)
        .map_err(|e| ContractError::serialization(format!("stage '{tag}' config: {e}")))?;
    Ok(StageRecord {
        tag: StageTag::new(tag),
        version,
        cache,
        config,
    })
}

pub(crate) fn decode_config<C: DeserializeOwned>(record: &StageRecord) -> Result<C, ContractError> {
    bincode::deserialize(&record.config).map_err(|e| {
        ContractError::serialization(format!("stage '{}' config: {e}", record.tag))
    })
}

pub(crate) fn check_version(record: &StageRecord, supported: u32) -> Result<(), ContractError> {
    if record.version != supported {
        return Err(ContractError::serialization(format!(
            "stage '{}' config version {} is not supported (expected {supported})",
            record.tag, record.version
        )));
    }
    Ok(())
}

/// Error helper for failures inside a stage's computation
pub(crate) fn stage_error(tag: &str, message: impl Into<String>) -> ContractError {
    ContractError::stage(tag, message)
}
