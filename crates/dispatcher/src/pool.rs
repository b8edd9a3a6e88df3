//! Worker pools
//!
//! A pool executes one persisted unit per call; which worker picks up which
//! unit is decided by the batch queue, never by the submitter.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use config_loader::{validate_profile, ConfigLoader};
use contracts::{ContractError, PoolMode, PoolProfile};
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::error::DispatcherError;
use crate::worker_pool::WorkerPool;

/// Runs units on blocking threads of this process
#[derive(Debug, Clone)]
pub struct InProcessPool {
    name: String,
    workers: usize,
}

impl InProcessPool {
    pub fn new(name: impl Into<String>, workers: usize) -> Self {
        Self {
            name: name.into(),
            workers: workers.max(1),
        }
    }
}

impl WorkerPool for InProcessPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn workers(&self) -> usize {
        self.workers
    }

    async fn execute(&self, unit: &Path) -> Result<(), ContractError> {
        let unit = unit.to_path_buf();
        tokio::task::spawn_blocking(move || workunit::execute(&unit).map(|_| ()))
            .await
            .map_err(|e| ContractError::dispatch(format!("worker thread failed: {e}")))?
    }
}

/// Runs each unit in a child `<command> worker <unit>` process
#[derive(Debug, Clone)]
pub struct SubprocessPool {
    name: String,
    workers: usize,
    command: PathBuf,
}

impl SubprocessPool {
    pub fn new(name: impl Into<String>, workers: usize, command: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            workers: workers.max(1),
            command: command.into(),
        }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }
}

impl WorkerPool for SubprocessPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn workers(&self) -> usize {
        self.workers
    }

    async fn execute(&self, unit: &Path) -> Result<(), ContractError> {
        let status = Command::new(&self.command)
            .arg("worker")
            .arg(unit)
            .stdin(Stdio::null())
            .env_remove("TURNSTILE_METRICS_PORT")
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                ContractError::dispatch(format!(
                    "cannot start worker '{}': {e}",
                    self.command.display()
                ))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ContractError::stage(
                "worker",
                format!("'{}' exited with {status}", unit.display()),
            ))
        }
    }
}

/// The pool selected by a profile
#[derive(Debug, Clone)]
pub enum ConnectedPool {
    InProcess(InProcessPool),
    Subprocess(SubprocessPool),
}

impl WorkerPool for ConnectedPool {
    fn name(&self) -> &str {
        match self {
            Self::InProcess(pool) => pool.name(),
            Self::Subprocess(pool) => pool.name(),
        }
    }

    fn workers(&self) -> usize {
        match self {
            Self::InProcess(pool) => pool.workers(),
            Self::Subprocess(pool) => pool.workers(),
        }
    }

    async fn execute(&self, unit: &Path) -> Result<(), ContractError> {
        match self {
            Self::InProcess(pool) => pool.execute(unit).await,
            Self::Subprocess(pool) => pool.execute(unit).await,
        }
    }
}

/// Resolve the pool profile: `None` selects a local in-process pool sized to
/// the machine, `Some(path)` loads a profile file.
///
/// # Errors
/// `Connect` when the profile cannot be read or validated, or when a
/// subprocess pool's worker command is missing.
#[instrument(name = "connect_pool")]
pub fn connect(profile: Option<&Path>) -> Result<(ConnectedPool, PoolProfile), DispatcherError> {
    let profile = match profile {
        None => {
            let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
            PoolProfile::local(workers)
        }
        Some(path) => ConfigLoader::load_profile(path)
            .map_err(|e| DispatcherError::connect(path.display().to_string(), e.to_string()))?,
    };
    let pool = connect_profile(&profile)?;
    Ok((pool, profile))
}

/// Build the pool described by an already-loaded profile
pub fn connect_profile(profile: &PoolProfile) -> Result<ConnectedPool, DispatcherError> {
    validate_profile(profile).map_err(|e| DispatcherError::connect(&profile.name, e.to_string()))?;

    let pool = match profile.mode {
        PoolMode::InProcess => {
            ConnectedPool::InProcess(InProcessPool::new(&profile.name, profile.workers))
        }
        PoolMode::Subprocess => {
            let command = match &profile.worker_command {
                Some(command) => command.clone(),
                None => std::env::current_exe()
                    .map_err(|e| DispatcherError::connect(&profile.name, e.to_string()))?,
            };
            if !command.is_file() {
                return Err(DispatcherError::connect(
                    &profile.name,
                    format!("worker command '{}' not found", command.display()),
                ));
            }
            debug!(command = %command.display(), "subprocess workers");
            ConnectedPool::Subprocess(SubprocessPool::new(&profile.name, profile.workers, command))
        }
    };

    info!(pool = %pool.name(), workers = pool.workers(), mode = ?profile.mode, "worker pool connected");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_connection_is_local() {
        let (pool, profile) = connect(None).unwrap();
        assert!(matches!(pool, ConnectedPool::InProcess(_)));
        assert!(pool.workers() >= 1);
        assert_eq!(profile.mode, PoolMode::InProcess);
    }

    #[test]
    fn test_profile_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.toml");
        fs::write(&path, "name = \"lab\"\nworkers = 3\n").unwrap();

        let (pool, profile) = connect(Some(&path)).unwrap();
        assert_eq!(pool.name(), "lab");
        assert_eq!(pool.workers(), 3);
        assert!(!profile.fail_fast);
    }

    #[test]
    fn test_missing_profile_is_dispatch_error() {
        let dir = tempdir().unwrap();
        let err = connect(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert_eq!(err.kind(), contracts::ErrorKind::Dispatch);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = connect_profile(&PoolProfile::local(0)).unwrap_err();
        assert_eq!(err.kind(), contracts::ErrorKind::Dispatch);
    }

    #[test]
    fn test_missing_worker_command() {
        let profile = PoolProfile {
            mode: PoolMode::Subprocess,
            worker_command: Some(PathBuf::from("/nonexistent/turnstile")),
            ..PoolProfile::local(2)
        };
        let err = connect_profile(&profile).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_in_process_missing_unit_fails() {
        let dir = tempdir().unwrap();
        let pool = InProcessPool::new("local", 1);
        let err = pool.execute(&dir.path().join("pipeline.bin")).await.unwrap_err();
        assert_eq!(err.kind(), contracts::ErrorKind::Serialization);
    }
}
