//! # Work Unit
//!
//! Persisted (query, pipeline) pairs.
//!
//! - [`prepare`] builds and persists the unit of one target
//! - [`persist`] / [`load`] write and read the unit artifacts
//! - [`execute`] runs a persisted unit (the worker side)

mod executor;
mod prepare;
mod store;

pub use executor::{execute, execute_with};
pub use prepare::{prepare, PrepareRequest, CACHE_DIR, DOWNLOAD_FILE, RESULTS_DIR};
pub use store::{
    decode_artifact, encode_artifact, load, load_record, persist, WorkUnit, PIPELINE_FILE,
    QUERY_FILE,
};
