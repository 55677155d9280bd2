//! Runtime configuration: TOML file, then environment overrides.
//!
//! ```toml
//! [repair]
//! max_reprompts = 4
//! model_name = "model-a"
//! run_name = "run_1"
//!
//! [sandbox]
//! per_test_timeout_ms = 400
//! max_workers = 16
//!
//! [paths]
//! fixtures_root = "tests"
//! step_log_root = "output"
//! yes_no_problems = ["p126"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use fixloop_sandbox::SandboxConfig;
use fixloop_state::DEFAULT_YES_NO_PROBLEMS;

use crate::error::{FixloopError, Result};

/// Repair-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepairConfig {
    /// Maximum reprompts R; a problem gets at most R+1 attempts.
    pub max_reprompts: u32,
    /// Label persisted on every result record.
    pub model_name: String,
    /// Label persisted on every result record.
    pub run_name: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_reprompts: 4,
            model_name: "default".to_string(),
            run_name: "run_1".to_string(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub fixtures_root: PathBuf,
    pub step_log_root: PathBuf,
    pub yes_no_problems: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            fixtures_root: PathBuf::from("tests"),
            step_log_root: PathBuf::from("output"),
            yes_no_problems: DEFAULT_YES_NO_PROBLEMS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Top-level fixloop configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FixloopConfig {
    pub repair: RepairConfig,
    pub sandbox: SandboxConfig,
    pub paths: PathsConfig,
}

impl FixloopConfig {
    /// Load from a TOML file. Missing sections and keys take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `FIXLOOP_*` environment overrides.
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    ///
    /// Recognised keys: `FIXLOOP_MAX_REPROMPTS`, `FIXLOOP_TEST_TIMEOUT_MS`,
    /// `FIXLOOP_MAX_WORKERS`, `FIXLOOP_PYTHON`.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FIXLOOP_MAX_REPROMPTS") {
            self.repair.max_reprompts = parse_var("FIXLOOP_MAX_REPROMPTS", &v)?;
        }
        if let Some(v) = lookup("FIXLOOP_TEST_TIMEOUT_MS") {
            self.sandbox.per_test_timeout_ms = parse_var("FIXLOOP_TEST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("FIXLOOP_MAX_WORKERS") {
            self.sandbox.max_workers = parse_var("FIXLOOP_MAX_WORKERS", &v)?;
        }
        if let Some(v) = lookup("FIXLOOP_PYTHON") {
            self.sandbox.interpreter = v;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.sandbox
            .validate()
            .map_err(|e| FixloopError::Config(e.to_string()))?;
        if self.repair.model_name.trim().is_empty() || self.repair.run_name.trim().is_empty() {
            return Err(FixloopError::Config(
                "model_name and run_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| FixloopError::Config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = FixloopConfig::default();
        assert_eq!(cfg.repair.max_reprompts, 4);
        assert_eq!(cfg.sandbox.per_test_timeout_ms, 400);
        assert_eq!(cfg.sandbox.max_workers, 16);
        assert_eq!(cfg.paths.yes_no_problems, vec!["p126".to_string()]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = FixloopConfig::from_toml_str(
            r#"
            [repair]
            max_reprompts = 2

            [sandbox]
            interpreter = "python3.12"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.repair.max_reprompts, 2);
        assert_eq!(cfg.repair.run_name, "run_1");
        assert_eq!(cfg.sandbox.interpreter, "python3.12");
        assert_eq!(cfg.sandbox.max_workers, 16);
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let err = FixloopConfig::from_toml_str("[repair\nmax_reprompts = ").unwrap_err();
        assert!(matches!(err, FixloopError::ConfigParse(_)));
    }

    #[test]
    fn overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("FIXLOOP_MAX_REPROMPTS", "1"),
            ("FIXLOOP_TEST_TIMEOUT_MS", " 900 "),
            ("FIXLOOP_PYTHON", "/usr/bin/python3"),
        ]
        .into_iter()
        .collect();
        let cfg = FixloopConfig::default()
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.repair.max_reprompts, 1);
        assert_eq!(cfg.sandbox.per_test_timeout_ms, 900);
        assert_eq!(cfg.sandbox.max_workers, 16);
        assert_eq!(cfg.sandbox.interpreter, "/usr/bin/python3");
    }

    #[test]
    fn unparsable_override_is_config_error() {
        let err = FixloopConfig::default()
            .apply_overrides(|k| (k == "FIXLOOP_MAX_WORKERS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, FixloopError::Config(ref m) if m.contains("FIXLOOP_MAX_WORKERS")));
    }

    #[test]
    fn zero_workers_rejected() {
        let mut cfg = FixloopConfig::default();
        cfg.sandbox.max_workers = 0;
        assert!(matches!(cfg.validate(), Err(FixloopError::Config(_))));
    }

    #[test]
    fn serde_round_trip() {
        let cfg = FixloopConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        assert_eq!(FixloopConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixloop.toml");
        std::fs::write(&path, "[paths]\nfixtures_root = \"fx\"\n").unwrap();
        let cfg = FixloopConfig::load(&path).unwrap();
        assert_eq!(cfg.paths.fixtures_root, PathBuf::from("fx"));
    }
}
