//! Query - the parameter half of a work unit
//!
//! The query is handed to the terminal stage of a pipeline and travels up the
//! chain. Its JSON mirror (`query.json`) is for humans only and is never read
//! back by workers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ContractError, InjectedSystem, Planet};

/// Per-target search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Kepler Input Catalog identifier of the target
    pub kicid: u64,

    /// Download manifest written by the root stage's bootstrap
    pub prepared_file: PathBuf,

    /// Trial transit durations (days), ascending
    pub durations: Vec<f64>,

    /// Minimum orbital period (days)
    pub min_period: f64,

    /// Maximum orbital period (days)
    pub max_period: f64,

    /// Directory receiving validation output
    pub validation_path: PathBuf,

    /// Synthetic planets to inject, if any
    #[serde(default)]
    pub injection: Option<InjectedSystem>,
}

impl Query {
    /// Build a query, sorting `durations` and making both paths absolute.
    ///
    /// # Errors
    /// Fails when the current directory is needed to absolutize a relative
    /// path and cannot be read.
    pub fn new(
        kicid: u64,
        prepared_file: impl AsRef<Path>,
        durations: impl IntoIterator<Item = f64>,
        min_period: f64,
        max_period: f64,
        validation_path: impl AsRef<Path>,
    ) -> Result<Self, ContractError> {
        let mut durations: Vec<f64> = durations.into_iter().collect();
        durations.sort_by(f64::total_cmp);

        Ok(Self {
            kicid,
            prepared_file: absolute(prepared_file.as_ref())?,
            durations,
            min_period,
            max_period,
            validation_path: absolute(validation_path.as_ref())?,
            injection: None,
        })
    }

    /// Attach an injected system
    pub fn with_injection(mut self, system: InjectedSystem) -> Self {
        self.injection = Some(system);
        self
    }

    /// Shortest trial duration
    pub fn min_duration(&self) -> Option<f64> {
        self.durations.first().copied()
    }

    /// Render the sorted-key, 2-space-indented JSON mirror.
    ///
    /// Injection fields are merged into the top-level object; without an
    /// injection none of `injections`, `mstar`, `q1`, `q2`, `rstar` appear.
    pub fn to_mirror_json(&self) -> Result<String, ContractError> {
        let mut fields: BTreeMap<&str, Value> = BTreeMap::new();
        fields.insert("kicid", Value::from(self.kicid));
        fields.insert("prepared_file", path_value(&self.prepared_file)?);
        fields.insert("durations", Value::from(self.durations.clone()));
        fields.insert("min_period", Value::from(self.min_period));
        fields.insert("max_period", Value::from(self.max_period));
        fields.insert("validation_path", path_value(&self.validation_path)?);

        if let Some(system) = &self.injection {
            fields.insert("injections", to_value(&system.planets)?);
            fields.insert("mstar", Value::from(system.mstar));
            fields.insert("rstar", Value::from(system.rstar));
            fields.insert("q1", Value::from(system.q1));
            fields.insert("q2", Value::from(system.q2));
        }

        serde_json::to_string_pretty(&fields)
            .map_err(|e| ContractError::serialization(format!("query mirror: {e}")))
    }

    /// Parse a JSON mirror back into a query
    pub fn from_mirror_json(content: &str) -> Result<Self, ContractError> {
        let mirror: MirrorFields = serde_json::from_str(content)
            .map_err(|e| ContractError::serialization(format!("query mirror: {e}")))?;
        mirror.into_query()
    }
}

/// Flat shape of `query.json`
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MirrorFields {
    kicid: u64,
    prepared_file: PathBuf,
    durations: Vec<f64>,
    min_period: f64,
    max_period: f64,
    validation_path: PathBuf,
    #[serde(default)]
    injections: Option<Vec<Planet>>,
    #[serde(default)]
    mstar: Option<f64>,
    #[serde(default)]
    rstar: Option<f64>,
    #[serde(default)]
    q1: Option<f64>,
    #[serde(default)]
    q2: Option<f64>,
}

impl MirrorFields {
    fn into_query(self) -> Result<Query, ContractError> {
        let injection = match (self.injections, self.mstar, self.rstar, self.q1, self.q2) {
            (None, None, None, None, None) => None,
            (Some(planets), Some(mstar), Some(rstar), Some(q1), Some(q2)) => Some(InjectedSystem {
                q1,
                q2,
                mstar,
                rstar,
                planets,
            }),
            _ => {
                return Err(ContractError::serialization(
                    "query mirror: incomplete injection fields",
                ))
            }
        };

        Ok(Query {
            kicid: self.kicid,
            prepared_file: self.prepared_file,
            durations: self.durations,
            min_period: self.min_period,
            max_period: self.max_period,
            validation_path: self.validation_path,
            injection,
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ContractError> {
    std::path::absolute(path).map_err(|e| ContractError::path(path, e.to_string()))
}

fn path_value(path: &Path) -> Result<Value, ContractError> {
    path.to_str().map(Value::from).ok_or_else(|| {
        ContractError::serialization(format!(
            "query mirror: path '{}' is not valid UTF-8",
            path.display()
        ))
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ContractError> {
    serde_json::to_value(value)
        .map_err(|e| ContractError::serialization(format!("query mirror: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_query() -> Query {
        Query::new(
            12345678,
            "/results/12345678/download.bin",
            [0.6, 0.2, 0.4],
            50.0,
            400.0,
            "/results/12345678/results",
        )
        .unwrap()
    }

    fn sample_system() -> InjectedSystem {
        InjectedSystem {
            q1: 0.3,
            q2: 0.7,
            mstar: 1.0,
            rstar: 1.0,
            planets: vec![Planet {
                period: 120.5,
                t0: 3.25,
                radius: 0.05,
                b: 0.4,
                e: 0.1,
                pomega: 1.5,
            }],
        }
    }

    #[test]
    fn test_durations_sorted() {
        assert_eq!(sample_query().durations, vec![0.2, 0.4, 0.6]);
    }

    #[test]
    fn test_relative_paths_become_absolute() {
        let q = Query::new(1, "download.bin", [0.2], 50.0, 400.0, "results").unwrap();
        assert!(q.prepared_file.is_absolute());
        assert!(q.validation_path.is_absolute());
    }

    #[test]
    fn test_mirror_layout() {
        let json = sample_query().to_mirror_json().unwrap();
        let expected = r#"{
  "durations": [
    0.2,
    0.4,
    0.6
  ],
  "kicid": 12345678,
  "max_period": 400.0,
  "min_period": 50.0,
  "prepared_file": "/results/12345678/download.bin",
  "validation_path": "/results/12345678/results"
}"#;
        assert_eq!(json, expected);
        assert!(!json.contains("injections"));
        assert!(json.lines().all(|l| !l.ends_with(' ')));
    }

    #[test]
    fn test_mirror_flattens_injection() {
        let q = sample_query().with_injection(sample_system());
        let json = q.to_mirror_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(value.get("injections").unwrap().is_array());
        assert_eq!(value["q1"], 0.3);
        assert!(value.get("injection").is_none());
    }

    #[test]
    fn test_mirror_round_trip() {
        let plain = sample_query();
        let back = Query::from_mirror_json(&plain.to_mirror_json().unwrap()).unwrap();
        assert_eq!(back, plain);

        let injected = sample_query().with_injection(sample_system());
        let back = Query::from_mirror_json(&injected.to_mirror_json().unwrap()).unwrap();
        assert_eq!(back, injected);
    }

    #[test]
    fn test_mirror_round_trip_is_exact() {
        let mut system = sample_system();
        system.q1 = 0.11264622392357593;
        system.q2 = 0.7071067811865476;
        system.planets = (1..500)
            .map(|i| {
                let x = (i as f64).sqrt() / 97.0;
                Planet {
                    period: 50.0 * (x * 2.0794415416798357).exp(),
                    t0: x * std::f64::consts::PI,
                    radius: 0.005 + x / 7.0,
                    b: x.fract(),
                    e: 0.12184957469113625 * x,
                    pomega: std::f64::consts::TAU * x.fract(),
                }
            })
            .collect();
        let q = sample_query().with_injection(system);

        let back = Query::from_mirror_json(&q.to_mirror_json().unwrap()).unwrap();
        let original = q.injection.as_ref().unwrap();
        let reloaded = back.injection.as_ref().unwrap();
        assert_eq!(reloaded.q1.to_bits(), original.q1.to_bits());
        for (a, b) in original.planets.iter().zip(&reloaded.planets) {
            assert_eq!(a.period.to_bits(), b.period.to_bits());
            assert_eq!(a.e.to_bits(), b.e.to_bits());
        }
        assert_eq!(back, q);
    }

    #[cfg(unix)]
    #[test]
    fn test_mirror_rejects_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut q = sample_query();
        q.validation_path = PathBuf::from(OsStr::from_bytes(b"/results/\xff"));
        let err = q.to_mirror_json().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Serialization);
    }

    #[test]
    fn test_mirror_rejects_partial_injection() {
        let json = r#"{
  "durations": [0.2],
  "kicid": 1,
  "max_period": 400.0,
  "min_period": 50.0,
  "prepared_file": "/a",
  "q1": 0.5,
  "validation_path": "/b"
}"#;
        let err = Query::from_mirror_json(json).unwrap_err();
        assert!(err.to_string().contains("incomplete injection"));
    }
}
