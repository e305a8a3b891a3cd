//! Ambient engineering tuning: concurrency cap, timeouts, retry policy.
//! Loaded from an optional `deployer.toml` next to the twin's
//! `config.json`, overridable by environment variables, defaulting
//! otherwise.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DeployerError, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeployerSettings {
    pub concurrency: usize,
    pub sdk_op_timeout: Duration,
    pub iac_apply_timeout: Duration,
    pub http_warmup_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for DeployerSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            sdk_op_timeout: Duration::from_secs(120),
            iac_apply_timeout: Duration::from_secs(3600),
            http_warmup_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    concurrency: Option<usize>,
    sdk_op_timeout_secs: Option<u64>,
    iac_apply_timeout_secs: Option<u64>,
    http_warmup_timeout_secs: Option<u64>,
    retry_base_delay_secs: Option<u64>,
    retry_backoff_factor: Option<f64>,
    retry_max_attempts: Option<u32>,
}

impl DeployerSettings {
    /// Loads `deployer.toml` from `project_path` if present, then
    /// applies `TWIN2MC_*` environment overrides on top.
    pub fn load(project_path: &Path) -> Result<Self> {
        let mut settings = Self::default();

        let toml_path = project_path.join("deployer.toml");
        if toml_path.exists() {
            let raw_text = std::fs::read_to_string(&toml_path)?;
            let raw: RawSettings = toml::from_str(&raw_text).map_err(|err| {
                DeployerError::configuration(format!("invalid deployer.toml: {err}"), "deployer.toml")
            })?;
            settings.apply_raw(raw);
        }

        settings.apply_env();
        Ok(settings)
    }

    fn apply_raw(&mut self, raw: RawSettings) {
        if let Some(v) = raw.concurrency {
            self.concurrency = v;
        }
        if let Some(v) = raw.sdk_op_timeout_secs {
            self.sdk_op_timeout = Duration::from_secs(v);
        }
        if let Some(v) = raw.iac_apply_timeout_secs {
            self.iac_apply_timeout = Duration::from_secs(v);
        }
        if let Some(v) = raw.http_warmup_timeout_secs {
            self.http_warmup_timeout = Duration::from_secs(v);
        }
        if let Some(v) = raw.retry_base_delay_secs {
            self.retry.base_delay = Duration::from_secs(v);
        }
        if let Some(v) = raw.retry_backoff_factor {
            self.retry.backoff_factor = v;
        }
        if let Some(v) = raw.retry_max_attempts {
            self.retry.max_attempts = v;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("TWIN2MC_CONCURRENCY") {
            if let Ok(parsed) = v.parse() {
                self.concurrency = parsed;
            }
        }
        if let Ok(v) = env::var("TWIN2MC_SDK_OP_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse() {
                self.sdk_op_timeout = Duration::from_secs(parsed);
            }
        }
        if let Ok(v) = env::var("TWIN2MC_IAC_APPLY_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse() {
                self.iac_apply_timeout = Duration::from_secs(parsed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DeployerSettings::load(dir.path()).unwrap();
        assert_eq!(settings.concurrency, 8);
        assert_eq!(settings.retry.max_attempts, 5);
    }

    #[test]
    fn toml_overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deployer.toml"), "concurrency = 3\n").unwrap();
        let settings = DeployerSettings::load(dir.path()).unwrap();
        assert_eq!(settings.concurrency, 3);
    }
}
