//! PreparedDownload - root stage
//!
//! `prepare` stages the raw light curves of one target from the archive into
//! the data directory and writes a manifest; `query` reads them back.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use contracts::{ContractError, Query, StageRecord, StageTag};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::lightcurve::LightCurve;
use crate::stage::{check_version, decode_config, encode_record, stage_error, Stage, StageOutput};

/// Config of the root stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Cache root shared by the whole chain
    pub basepath: PathBuf,
}

/// Written by [`PreparedDownload::prepare`], named by `Query::prepared_file`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadManifest {
    pub kicid: u64,
    /// Staged light-curve files, sorted
    pub files: Vec<PathBuf>,
}

/// Root stage: loads the staged light curves of the queried target
#[derive(Debug, Clone)]
pub struct PreparedDownload {
    config: DownloadConfig,
}

impl PreparedDownload {
    pub const TAG: &'static str = "download";
    pub const VERSION: u32 = 1;

    pub fn new(basepath: impl Into<PathBuf>) -> Self {
        Self {
            config: DownloadConfig {
                basepath: basepath.into(),
            },
        }
    }

    /// Copy `archive_root/<kicid>/*.json` into `data_root/<kicid>/` and write
    /// the manifest to `artifact_path`.
    ///
    /// # Errors
    /// `Path` when the archive directory is missing, holds no light curves,
    /// or the destination cannot be created.
    #[instrument(name = "download_prepare", skip_all, fields(kicid = kicid))]
    pub fn prepare(
        artifact_path: &Path,
        archive_root: &Path,
        data_root: &Path,
        kicid: u64,
    ) -> Result<DownloadManifest, ContractError> {
        let source = archive_root.join(kicid.to_string());
        if !source.is_dir() {
            return Err(ContractError::path(&source, "archive directory not found"));
        }

        let mut inputs: Vec<PathBuf> = fs::read_dir(&source)
            .map_err(|e| ContractError::path(&source, e.to_string()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        inputs.sort();

        if inputs.is_empty() {
            return Err(ContractError::path(&source, "no light-curve files found"));
        }

        let dest = data_root.join(kicid.to_string());
        fs::create_dir_all(&dest).map_err(|e| ContractError::path(&dest, e.to_string()))?;

        let mut files = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let Some(name) = input.file_name() else {
                continue;
            };
            let target = std::path::absolute(dest.join(name))?;
            fs::copy(input, &target).map_err(|e| ContractError::path(input, e.to_string()))?;
            debug!(file = %target.display(), "staged light curve");
            files.push(target);
        }

        let manifest = DownloadManifest { kicid, files };
        write_manifest(artifact_path, &manifest)?;

        info!(
            files = manifest.files.len(),
            manifest = %artifact_path.display(),
            "download prepared"
        );
        Ok(manifest)
    }

    /// Read a manifest written by [`PreparedDownload::prepare`]
    pub fn load_manifest(path: &Path) -> Result<DownloadManifest, ContractError> {
        let bytes = fs::read(path).map_err(|e| {
            stage_error(Self::TAG, format!("cannot read '{}': {e}", path.display()))
        })?;
        bincode::deserialize(&bytes).map_err(|e| {
            stage_error(Self::TAG, format!("corrupt manifest '{}': {e}", path.display()))
        })
    }

    /// Rebuild from a record; the root takes no upstream.
    pub fn from_record(
        upstream: Option<Box<dyn Stage>>,
        record: &StageRecord,
    ) -> Result<Box<dyn Stage>, ContractError> {
        check_version(record, Self::VERSION)?;
        if upstream.is_some() {
            return Err(ContractError::serialization(
                "download stage must be the root of the chain",
            ));
        }
        let config: DownloadConfig = decode_config(record)?;
        Ok(Box::new(Self { config }))
    }

    fn read_curve(path: &Path) -> Result<LightCurve, ContractError> {
        let file = File::open(path).map_err(|e| {
            stage_error(Self::TAG, format!("cannot open '{}': {e}", path.display()))
        })?;
        let raw: LightCurve = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            stage_error(Self::TAG, format!("invalid light curve '{}': {e}", path.display()))
        })?;
        LightCurve::new(raw.time, raw.flux, raw.ivar)
            .map_err(|e| stage_error(Self::TAG, format!("'{}': {e}", path.display())))
    }
}

fn write_manifest(path: &Path, manifest: &DownloadManifest) -> Result<(), ContractError> {
    let bytes = bincode::serialize(manifest)
        .map_err(|e| ContractError::serialization(format!("download manifest: {e}")))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ContractError::path(parent, e.to_string()))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl Stage for PreparedDownload {
    fn tag(&self) -> StageTag {
        StageTag::new(Self::TAG)
    }

    fn cache_enabled(&self) -> bool {
        false
    }

    fn upstream(&self) -> Option<&dyn Stage> {
        None
    }

    fn basepath(&self) -> Option<&Path> {
        Some(&self.config.basepath)
    }

    fn record(&self) -> Result<StageRecord, ContractError> {
        encode_record(Self::TAG, Self::VERSION, false, &self.config)
    }

    fn compute(&self, query: &Query) -> Result<StageOutput, ContractError> {
        let manifest = Self::load_manifest(&query.prepared_file)?;
        if manifest.kicid != query.kicid {
            return Err(stage_error(
                Self::TAG,
                format!(
                    "manifest is for target {} but query is for {}",
                    manifest.kicid, query.kicid
                ),
            ));
        }

        let light_curves = manifest
            .files
            .iter()
            .map(|path| Self::read_curve(path))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(curves = light_curves.len(), "light curves loaded");
        Ok(StageOutput {
            light_curves,
            ..Default::default()
        })
    }
}
