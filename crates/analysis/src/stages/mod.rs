//! The six stage types, root first

pub mod download;
pub mod inject;
pub mod likelihood;
pub mod prepare;
pub mod search;

pub use download::{DownloadConfig, DownloadManifest, PreparedDownload};
pub use inject::{transit_duration, Inject, InjectConfig, InjectStage};
pub use likelihood::{Likelihood, LikelihoodConfig, LikelihoodStage};
pub use prepare::{Prepare, PrepareStage, PrepareStageConfig};
pub use search::{
    period_grid, OneDSearch, OneDSearchConfig, OneDSearchStage, TwoDSearch, TwoDSearchConfig,
    TwoDSearchStage, PEAKS_FILE,
};
