//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试（工作单元格式）
//! - prepare -> dispatch -> execute 端到端流程（无需外部集群）

#[cfg(test)]
mod fixtures {
    use std::fs;
    use std::path::{Path, PathBuf};

    use analysis::LightCurve;
    use contracts::PrepareConfig;
    use workunit::{prepare, PrepareRequest, WorkUnit};

    /// 0.1-day cadence over 300 days with 1% dips every 60 days
    pub fn transit_curve() -> LightCurve {
        let time: Vec<f64> = (0..3000).map(|i| i as f64 * 0.1).collect();
        let flux = time
            .iter()
            .map(|t| if (t - 10.0).rem_euclid(60.0) < 0.4 { 0.99 } else { 1.0 })
            .collect();
        LightCurve::new(time, flux, vec![1.0; 3000]).unwrap()
    }

    pub fn search_config() -> PrepareConfig {
        PrepareConfig {
            durations: vec![0.4],
            min_period: 50.0,
            max_period: 70.0,
            ..Default::default()
        }
    }

    /// Write an archive for `kicid` and prepare its unit under `root/results`
    pub fn prepare_target(root: &Path, kicid: u64, config: PrepareConfig) -> WorkUnit {
        let target = root.join("archive").join(kicid.to_string());
        fs::create_dir_all(&target).unwrap();
        fs::write(
            target.join("q1.json"),
            serde_json::to_vec(&transit_curve()).unwrap(),
        )
        .unwrap();

        prepare(
            PrepareRequest {
                kicid,
                archive_root: root.join("archive"),
                data_root: root.join("data"),
                results_root: root.join("results").join(kicid.to_string()),
                config,
            },
            &mut prior::seeded_rng(Some(kicid)),
        )
        .unwrap()
    }

    pub fn pattern(root: &Path) -> String {
        root.join("results/*/pipeline.bin").display().to_string()
    }

    pub fn pool_profile(root: &Path, workers: usize) -> PathBuf {
        let path = root.join("pool.toml");
        fs::write(&path, format!("name = \"local\"\nworkers = {workers}\n")).unwrap();
        path
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{WORK_UNIT_FORMAT_VERSION, WORK_UNIT_MAGIC};

    use crate::fixtures::{prepare_target, search_config};

    #[test]
    fn test_artifact_header() {
        let dir = tempfile::tempdir().unwrap();
        let unit = prepare_target(dir.path(), 11, search_config());

        let bytes = std::fs::read(unit.artifact_path()).unwrap();
        assert_eq!(&bytes[..4], &WORK_UNIT_MAGIC);
        assert_eq!(
            u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            WORK_UNIT_FORMAT_VERSION
        );
    }

    #[test]
    fn test_mirror_matches_artifact_query() {
        let dir = tempfile::tempdir().unwrap();
        let config = contracts::PrepareConfig {
            injection: Some(contracts::InjectionConfig {
                count: 2,
                seed: Some(3),
                ..Default::default()
            }),
            ..search_config()
        };
        let unit = prepare_target(dir.path(), 12, config);

        let mirror = std::fs::read_to_string(unit.mirror_path()).unwrap();
        let record = workunit::load_record(&unit.artifact_path()).unwrap();
        assert_eq!(contracts::Query::from_mirror_json(&mirror).unwrap(), record.query);
        assert_eq!(
            record.pipeline.tags(),
            vec![
                "download",
                "inject",
                "prepare",
                "likelihood",
                "one_d_search",
                "two_d_search"
            ]
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;

    use analysis::PEAKS_FILE;
    use contracts::UnitStatus;
    use dispatcher::{BatchContext, DispatcherError};
    use observability::metrics::BatchStatsAggregator;

    use crate::fixtures::{pattern, pool_profile, prepare_target, search_config};

    /// End-to-end: prepare -> dispatch (in-process pool) -> peaks on disk
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_prepare_and_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let units: Vec<_> = (1..=2)
            .map(|kicid| prepare_target(dir.path(), kicid, search_config()))
            .collect();
        let profile = pool_profile(dir.path(), 2);

        let report = dispatcher::run(&pattern(dir.path()), Some(&profile))
            .await
            .unwrap();

        assert_eq!(report.pool, "local");
        assert!(report.is_success(), "report = {report:?}");
        assert_eq!(report.len(), 2);
        for unit in &units {
            let peaks = unit.query().validation_path.join(PEAKS_FILE);
            assert!(peaks.is_file(), "missing {}", peaks.display());
        }
    }

    /// One broken unit among five: the other four still complete
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let units: Vec<_> = (1..=5)
            .map(|kicid| prepare_target(dir.path(), kicid, search_config()))
            .collect();
        fs::remove_file(&units[2].query().prepared_file).unwrap();
        let profile = pool_profile(dir.path(), 2);

        let report = dispatcher::run(&pattern(dir.path()), Some(&profile))
            .await
            .unwrap();

        assert_eq!(report.len(), 5);
        assert_eq!(report.succeeded().len(), 4);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path, units[2].artifact_path());

        let mut stats = BatchStatsAggregator::new();
        for unit in &report.units {
            stats.update(&unit.status, unit.duration.map(|d| d.as_secs_f64()));
        }
        let summary = stats.summary();
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_cancelled_batch_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let unit = prepare_target(dir.path(), 7, search_config());
        let profile = pool_profile(dir.path(), 1);

        let ctx = BatchContext::new();
        ctx.cancel();
        let report = dispatcher::run_with_context(&pattern(dir.path()), Some(&profile), &ctx)
            .await
            .unwrap();

        assert_eq!(report.units[0].status, UnitStatus::Cancelled);
        assert!(!unit.query().validation_path.join(PEAKS_FILE).exists());
    }

    #[tokio::test]
    async fn test_unreadable_profile_aborts_before_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        prepare_target(dir.path(), 8, search_config());

        let err = dispatcher::run(&pattern(dir.path()), Some(&dir.path().join("missing.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatcherError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_empty_pattern_is_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = dispatcher::run(&pattern(dir.path()), None).await.unwrap();
        assert!(report.is_empty());
        assert!(report.is_success());
    }
}
