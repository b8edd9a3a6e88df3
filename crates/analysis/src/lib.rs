//! # Analysis
//!
//! The transit-search stage chain.
//!
//! - `lightcurve`: folding, binning and box-depth kernels
//! - `stage`: the `Stage` trait and the generic `Link` wrapper
//! - `stages`: the six stage types
//! - `cache`: on-disk reuse of stage outputs
//! - `composer`: builds chains in the fixed stage order
//! - `registry`: rebuilds chains from their serialized records

pub mod cache;
pub mod composer;
pub mod lightcurve;
pub mod pipeline;
pub mod registry;
pub mod stage;
pub mod stages;

pub use cache::{cache_key, StageCache};
pub use composer::{check_chain_order, PipelineComposer, CHAIN_ORDER};
pub use lightcurve::{BinMethod, LightCurve};
pub use pipeline::Pipeline;
pub use registry::{StageConstructor, StageRegistry};
pub use stage::{DepthProfile, Link, Peak, Stage, StageKind, StageOutput};
pub use stages::{DownloadManifest, PreparedDownload, PEAKS_FILE};
