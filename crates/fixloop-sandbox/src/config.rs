//! Sandbox execution limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SandboxError, SandboxResult};

/// Configuration for sandboxed fixture execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Hard wall-clock limit for one unit (milliseconds).
    pub per_test_timeout_ms: u64,
    /// Upper bound on concurrently running units.
    pub max_workers: usize,
    /// Per-test allowance added to the global deadline (milliseconds).
    pub overhead_ms: u64,
    /// Fixed allowance added once to the global deadline (milliseconds).
    pub grace_ms: u64,
    /// Interpreter executable used by the process runner.
    pub interpreter: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            per_test_timeout_ms: 400,
            max_workers: 16,
            overhead_ms: 2_000,
            grace_ms: 20_000,
            interpreter: "python3".to_string(),
        }
    }
}

impl SandboxConfig {
    pub fn per_test_timeout(&self) -> Duration {
        Duration::from_millis(self.per_test_timeout_ms)
    }

    /// Pool size for `n` units: `min(max_workers, parallelism, n)`, at least 1.
    pub fn pool_size(&self, n: usize) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1);
        self.max_workers.min(cpus).min(n).max(1)
    }

    /// Global deadline for `n` units: `(per_test + overhead) * n + grace`.
    pub fn global_deadline(&self, n: usize, per_test: Duration) -> Duration {
        let per_unit = per_test + Duration::from_millis(self.overhead_ms);
        per_unit.saturating_mul(n as u32) + Duration::from_millis(self.grace_ms)
    }

    pub fn validate(&self) -> SandboxResult<()> {
        if self.per_test_timeout_ms == 0 {
            return Err(SandboxError::InvalidConfig(
                "per_test_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(SandboxError::InvalidConfig(
                "max_workers must be greater than zero".to_string(),
            ));
        }
        if self.interpreter.trim().is_empty() {
            return Err(SandboxError::InvalidConfig(
                "interpreter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = SandboxConfig::default();
        assert_eq!(cfg.per_test_timeout_ms, 400);
        assert_eq!(cfg.max_workers, 16);
        assert_eq!(cfg.interpreter, "python3");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn pool_size_is_clamped() {
        let cfg = SandboxConfig::default();
        assert_eq!(cfg.pool_size(0), 1);
        assert_eq!(cfg.pool_size(1), 1);
        assert!(cfg.pool_size(1_000) <= 16);
    }

    #[test]
    fn global_deadline_formula() {
        let cfg = SandboxConfig::default();
        let d = cfg.global_deadline(3, Duration::from_millis(400));
        assert_eq!(d, Duration::from_millis(2_400 * 3 + 20_000));
    }

    #[test]
    fn zero_timeout_rejected() {
        let cfg = SandboxConfig {
            per_test_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(SandboxError::InvalidConfig(_))));
    }

    #[test]
    fn serde_fills_missing_fields() {
        let cfg: SandboxConfig = serde_json::from_str(r#"{"max_workers": 2}"#).unwrap();
        assert_eq!(cfg.max_workers, 2);
        assert_eq!(cfg.per_test_timeout_ms, 400);
    }
}
