//! Pipeline - the terminal stage of a composed chain

use std::path::Path;

use contracts::{ContractError, PipelineRecord, Query, StageTag};
use tracing::instrument;

use crate::stage::{Stage, StageOutput};

/// A fully composed chain, addressed through its terminal stage
#[derive(Debug)]
pub struct Pipeline {
    terminal: Box<dyn Stage>,
}

impl Pipeline {
    pub fn new(terminal: Box<dyn Stage>) -> Self {
        Self { terminal }
    }

    pub fn terminal(&self) -> &dyn Stage {
        self.terminal.as_ref()
    }

    /// The root stage
    pub fn root(&self) -> &dyn Stage {
        let mut stage = self.terminal.as_ref();
        while let Some(up) = stage.upstream() {
            stage = up;
        }
        stage
    }

    /// Stages root first
    pub fn stages(&self) -> Vec<&dyn Stage> {
        let mut stages = Vec::new();
        let mut current = Some(self.terminal.as_ref());
        while let Some(stage) = current {
            stages.push(stage);
            current = stage.upstream();
        }
        stages.reverse();
        stages
    }

    /// Stage tags root first
    pub fn tags(&self) -> Vec<StageTag> {
        self.stages().into_iter().map(|s| s.tag()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages().len()
    }

    /// A chain always holds at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Cache root of the chain
    pub fn basepath(&self) -> Option<&Path> {
        self.terminal.basepath()
    }

    /// Serialized chain, root first
    pub fn record(&self) -> Result<PipelineRecord, ContractError> {
        let stages = self
            .stages()
            .into_iter()
            .map(|s| s.record())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PipelineRecord { stages })
    }

    /// Run the chain for `query`
    #[instrument(name = "pipeline_query", skip_all, fields(kicid = query.kicid))]
    pub fn query(&self, query: &Query) -> Result<StageOutput, ContractError> {
        self.terminal.query(query)
    }
}
