//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Work unit model
//! - A `Query` holds the per-target parameters (durations ascending, paths absolute)
//! - A `PipelineRecord` is the serialized stage chain, root first
//! - A `WorkUnitRecord` pairs them and is written once, read once, never mutated

mod config;
mod error;
mod injection;
mod query;
mod record;
mod stage_tag;
mod status;

pub use config::*;
pub use error::*;
pub use injection::*;
pub use query::Query;
pub use record::*;
pub use stage_tag::StageTag;
pub use status::UnitStatus;
