//! Work-Unit Store
//!
//! A unit directory holds two artifacts written in one call from the same
//! query: `pipeline.bin` (executable) and `query.json` (for humans). Both are
//! staged as temporary files and renamed into place, so a failed persist
//! leaves neither behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use analysis::{Pipeline, StageRegistry};
use contracts::{
    ContractError, Query, WorkUnitRecord, WORK_UNIT_FORMAT_VERSION, WORK_UNIT_MAGIC,
};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// Executable artifact
pub const PIPELINE_FILE: &str = "pipeline.bin";

/// Human-readable query mirror
pub const QUERY_FILE: &str = "query.json";

const HEADER_LEN: usize = WORK_UNIT_MAGIC.len() + 4;

/// A persisted (query, pipeline) pair and where it lives
#[derive(Debug)]
pub struct WorkUnit {
    root: PathBuf,
    query: Query,
    pipeline: Pipeline,
}

impl WorkUnit {
    /// Unit directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.root.join(PIPELINE_FILE)
    }

    pub fn mirror_path(&self) -> PathBuf {
        self.root.join(QUERY_FILE)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Persist `query` and `pipeline` under `results_root`.
///
/// `results_root` is created if needed.
///
/// # Errors
/// `Path` when the directory cannot be created, `Serialization` when a stage
/// config cannot be encoded, `Io` when staging or renaming fails.
#[instrument(name = "persist_work_unit", skip(query, pipeline), fields(kicid = query.kicid, path = %results_root.display()))]
pub fn persist(
    results_root: &Path,
    query: Query,
    pipeline: Pipeline,
) -> Result<WorkUnit, ContractError> {
    fs::create_dir_all(results_root)
        .map_err(|e| ContractError::path(results_root, e.to_string()))?;
    let root = std::path::absolute(results_root)
        .map_err(|e| ContractError::path(results_root, e.to_string()))?;

    let record = WorkUnitRecord {
        query,
        pipeline: pipeline.record()?,
    };
    let artifact = encode_artifact(&record)?;
    let mirror = record.query.to_mirror_json()?;

    let artifact_tmp = stage_file(&root, &artifact)?;
    let mirror_tmp = stage_file(&root, mirror.as_bytes())?;

    let artifact_path = root.join(PIPELINE_FILE);
    artifact_tmp.persist(&artifact_path).map_err(|e| e.error)?;
    if let Err(e) = mirror_tmp.persist(root.join(QUERY_FILE)) {
        let _ = fs::remove_file(&artifact_path);
        return Err(e.error.into());
    }

    info!(stages = record.pipeline.len(), "work unit persisted");
    Ok(WorkUnit {
        root,
        query: record.query,
        pipeline,
    })
}

fn stage_file(dir: &Path, contents: &[u8]) -> Result<NamedTempFile, ContractError> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    Ok(file)
}

/// Magic, format version, then the bincode record
pub fn encode_artifact(record: &WorkUnitRecord) -> Result<Vec<u8>, ContractError> {
    let body = bincode::serialize(record)
        .map_err(|e| ContractError::serialization(format!("work unit: {e}")))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&WORK_UNIT_MAGIC);
    bytes.extend_from_slice(&WORK_UNIT_FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Inverse of [`encode_artifact`]
pub fn decode_artifact(bytes: &[u8]) -> Result<WorkUnitRecord, ContractError> {
    if bytes.len() < HEADER_LEN {
        return Err(ContractError::serialization("work unit artifact is truncated"));
    }
    let (magic, rest) = bytes.split_at(WORK_UNIT_MAGIC.len());
    if magic != WORK_UNIT_MAGIC {
        return Err(ContractError::serialization("not a work unit artifact"));
    }
    let (version, body) = rest.split_at(4);
    let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
    if version != WORK_UNIT_FORMAT_VERSION {
        return Err(ContractError::serialization(format!(
            "work unit format version {version} is not supported (expected {WORK_UNIT_FORMAT_VERSION})"
        )));
    }
    bincode::deserialize(body)
        .map_err(|e| ContractError::serialization(format!("work unit: {e}")))
}

/// Read the record of an artifact without rebuilding the chain
pub fn load_record(path: &Path) -> Result<WorkUnitRecord, ContractError> {
    let bytes = fs::read(path).map_err(|e| {
        ContractError::serialization(format!("cannot read '{}': {e}", path.display()))
    })?;
    decode_artifact(&bytes)
}

/// Load an artifact and rebuild its chain with `registry`
#[instrument(name = "load_work_unit", skip(registry), fields(path = %path.display()))]
pub fn load(path: &Path, registry: &StageRegistry) -> Result<WorkUnit, ContractError> {
    let record = load_record(path)?;
    let pipeline = registry.rebuild(&record.pipeline)?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    debug!(kicid = record.query.kicid, stages = pipeline.len(), "work unit loaded");
    Ok(WorkUnit {
        root,
        query: record.query,
        pipeline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::PipelineComposer;
    use contracts::{InjectedSystem, Planet};
    use tempfile::tempdir;

    fn unit_parts(dir: &Path, injected: bool) -> (Query, Pipeline) {
        let manifest = dir.join("download.bin");
        fs::write(&manifest, b"").unwrap();
        let mut query = Query::new(
            12345678,
            &manifest,
            [0.6, 0.2, 0.4],
            50.0,
            400.0,
            dir.join("results"),
        )
        .unwrap();
        if injected {
            query = query.with_injection(InjectedSystem {
                q1: 0.2,
                q2: 0.9,
                mstar: 1.1,
                rstar: 0.9,
                planets: vec![Planet {
                    period: 80.0,
                    t0: 4.0,
                    radius: 0.02,
                    b: 0.3,
                    e: 0.05,
                    pomega: 0.7,
                }],
            });
        }
        let pipeline = PipelineComposer::new(&manifest, dir.join("cache"))
            .with_injection(injected)
            .build()
            .unwrap();
        (query, pipeline)
    }

    #[test]
    fn test_persist_writes_both_artifacts() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("unit");
        let (query, pipeline) = unit_parts(dir.path(), false);

        let unit = persist(&root, query.clone(), pipeline).unwrap();
        assert!(unit.artifact_path().is_file());
        assert!(unit.mirror_path().is_file());

        let names: Vec<String> = fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "leftover temp files: {names:?}");

        let mirror = Query::from_mirror_json(&fs::read_to_string(unit.mirror_path()).unwrap()).unwrap();
        let record = load_record(&unit.artifact_path()).unwrap();
        assert_eq!(mirror, record.query);
        assert_eq!(record.query, query);
    }

    #[test]
    fn test_failed_mirror_removes_artifact() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("unit");
        let blocker = root.join(QUERY_FILE);
        fs::create_dir_all(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();
        let (query, pipeline) = unit_parts(dir.path(), false);

        assert!(persist(&root, query, pipeline).is_err());
        assert!(!root.join(PIPELINE_FILE).exists());

        let names: Vec<String> = fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![QUERY_FILE.to_string()]);
    }

    #[test]
    fn test_persist_is_idempotent_on_existing_dir() {
        let dir = tempdir().unwrap();
        let (query, pipeline) = unit_parts(dir.path(), false);
        persist(dir.path(), query.clone(), pipeline).unwrap();
        let (_, pipeline) = unit_parts(dir.path(), false);
        persist(dir.path(), query, pipeline).unwrap();
    }

    #[test]
    fn test_load_rebuilds_chain() {
        let dir = tempdir().unwrap();
        let (query, pipeline) = unit_parts(dir.path(), true);
        let expected = pipeline.record().unwrap();
        let unit = persist(&dir.path().join("unit"), query.clone(), pipeline).unwrap();

        let loaded = load(&unit.artifact_path(), &StageRegistry::default()).unwrap();
        assert_eq!(loaded.query(), &query);
        assert_eq!(loaded.pipeline().record().unwrap(), expected);
        assert_eq!(loaded.pipeline().tags()[1], "inject");
        assert_eq!(loaded.root(), unit.root());
    }

    #[test]
    fn test_bad_magic() {
        let err = decode_artifact(b"PK\x03\x04\x01\x00\x00\x00rest").unwrap_err();
        assert!(err.to_string().contains("not a work unit"));
    }

    #[test]
    fn test_truncated_artifact() {
        let dir = tempdir().unwrap();
        let (query, pipeline) = unit_parts(dir.path(), false);
        let unit = persist(&dir.path().join("unit"), query, pipeline).unwrap();

        let bytes = fs::read(unit.artifact_path()).unwrap();
        fs::write(unit.artifact_path(), &bytes[..bytes.len() / 2]).unwrap();
        let err = load(&unit.artifact_path(), &StageRegistry::default()).unwrap_err();
        assert_eq!(err.kind(), contracts::ErrorKind::Serialization);

        assert!(decode_artifact(&WORK_UNIT_MAGIC).is_err());
    }

    #[test]
    fn test_future_format_version_rejected() {
        let mut bytes = WORK_UNIT_MAGIC.to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        let err = decode_artifact(&bytes).unwrap_err();
        assert!(err.to_string().contains("version 2"));
    }

    #[test]
    fn test_missing_artifact_is_serialization_error() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join(PIPELINE_FILE), &StageRegistry::default()).unwrap_err();
        assert_eq!(err.kind(), contracts::ErrorKind::Serialization);
    }

    #[test]
    fn test_unknown_stage_surfaces_at_load() {
        let dir = tempdir().unwrap();
        let (query, pipeline) = unit_parts(dir.path(), false);
        let unit = persist(&dir.path().join("unit"), query, pipeline).unwrap();

        let registry = StageRegistry::empty();
        let err = load(&unit.artifact_path(), &registry).unwrap_err();
        assert!(err.to_string().contains("unknown stage type 'download'"));
    }
}
