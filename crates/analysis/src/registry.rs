//! StageRegistry - rebuilds live chains from their records

use std::collections::HashMap;
use std::fmt;

use contracts::{ContractError, PipelineRecord, StageRecord, StageTag};
use tracing::debug;

use crate::composer::check_chain_order;
use crate::pipeline::Pipeline;
use crate::stage::{Link, Stage, StageKind};
use crate::stages::{Inject, Likelihood, OneDSearch, Prepare, PreparedDownload, TwoDSearch};

/// Builds one stage from its record and already-built upstream
pub type StageConstructor =
    fn(Option<Box<dyn Stage>>, &StageRecord) -> Result<Box<dyn Stage>, ContractError>;

/// Tag-keyed table of stage constructors
#[derive(Clone)]
pub struct StageRegistry {
    constructors: HashMap<StageTag, StageConstructor>,
}

impl StageRegistry {
    /// Registry without any stage types
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor, replacing any previous one for `tag`
    pub fn register(&mut self, tag: impl Into<StageTag>, constructor: StageConstructor) {
        self.constructors.insert(tag.into(), constructor);
    }

    /// Register a non-root stage kind
    pub fn register_kind<K: StageKind>(&mut self) {
        self.register(K::TAG, Link::<K>::from_record);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(|t| t.as_str()).collect();
        tags.sort_unstable();
        tags
    }

    /// Rebuild the chain described by `record`, root first.
    ///
    /// # Errors
    /// `Serialization` for an empty chain, an unknown tag, an unsupported
    /// config version, undecodable config bytes or a chain that breaks the
    /// composer's stage order.
    pub fn rebuild(&self, record: &PipelineRecord) -> Result<Pipeline, ContractError> {
        let mut current: Option<Box<dyn Stage>> = None;
        for stage in &record.stages {
            let constructor = self.constructors.get(stage.tag.as_str()).ok_or_else(|| {
                ContractError::serialization(format!("unknown stage type '{}'", stage.tag))
            })?;
            current = Some(constructor(current.take(), stage)?);
        }

        let terminal = current
            .ok_or_else(|| ContractError::serialization("pipeline record has no stages"))?;
        check_chain_order(&record.tags())?;
        debug!(stages = record.len(), "pipeline rebuilt");
        Ok(Pipeline::new(terminal))
    }
}

impl Default for StageRegistry {
    /// All six built-in stage types
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PreparedDownload::TAG, PreparedDownload::from_record);
        registry.register_kind::<Inject>();
        registry.register_kind::<Prepare>();
        registry.register_kind::<Likelihood>();
        registry.register_kind::<OneDSearch>();
        registry.register_kind::<TwoDSearch>();
        registry
    }
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
