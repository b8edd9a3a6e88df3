//! Serialized forms of pipelines and work units
//!
//! A pipeline is persisted as an ordered list of stage records, root first.
//! Each record carries the stage tag, the stage's own config format version and
//! its config bytes; reconstruction goes through a tag-keyed registry.

use serde::{Deserialize, Serialize};

use crate::{Query, StageTag};

/// Leading bytes of every executable work-unit artifact
pub const WORK_UNIT_MAGIC: [u8; 4] = *b"TSWU";

/// Current work-unit container format
pub const WORK_UNIT_FORMAT_VERSION: u32 = 1;

/// One link of a serialized chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage type
    pub tag: StageTag,

    /// Version of the stage's config encoding
    pub version: u32,

    /// Whether the stage reuses cached outputs
    pub cache: bool,

    /// Stage-specific config, bincode encoded
    pub config: Vec<u8>,
}

/// A whole chain, root first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub stages: Vec<StageRecord>,
}

impl PipelineRecord {
    /// Root stage record
    pub fn root(&self) -> Option<&StageRecord> {
        self.stages.first()
    }

    /// Terminal stage record
    pub fn terminal(&self) -> Option<&StageRecord> {
        self.stages.last()
    }

    /// Tags in chain order
    pub fn tags(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.tag.as_str()).collect()
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// The persisted (query, pipeline) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkUnitRecord {
    pub query: Query,
    pub pipeline: PipelineRecord,
}
