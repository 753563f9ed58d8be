//! Judge configuration
//!
//! Loaded from environment variables (after `.env` has been applied by the
//! binary). Values are passed explicitly to [`crate::Judge`]; nothing here is
//! process-wide state.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::{JudgeError, Result};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Wall-clock limit for one compiler invocation (default: 30s)
    pub compile_timeout: Duration,
    /// Base per-test time limit in milliseconds when the problem has none (default: 1000ms)
    pub default_time_limit_ms: u32,
    /// Cap for each captured output stream (default: 16 MiB)
    pub max_output_bytes: usize,
    /// Optional language table overriding the embedded defaults
    pub languages_path: Option<PathBuf>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            compile_timeout: Duration::from_millis(30_000),
            default_time_limit_ms: 1000,
            max_output_bytes: 16 * 1024 * 1024,
            languages_path: None,
        }
    }
}

impl JudgeConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let compile_timeout_ms = env_or(
            "JUDGE_COMPILE_TIMEOUT_MS",
            defaults.compile_timeout.as_millis() as u64,
        )?;
        let default_time_limit_ms = env_or("JUDGE_TIME_LIMIT_MS", defaults.default_time_limit_ms)?;
        let max_output_bytes = env_or("JUDGE_MAX_OUTPUT_BYTES", defaults.max_output_bytes)?;
        let languages_path = std::env::var("LANGUAGES_CONFIG").ok().map(PathBuf::from);

        if compile_timeout_ms == 0 || default_time_limit_ms == 0 {
            return Err(JudgeError::Config("timeouts must be positive".into()));
        }

        let config = Self {
            compile_timeout: Duration::from_millis(compile_timeout_ms),
            default_time_limit_ms,
            max_output_bytes,
            languages_path,
        };
        debug!("Loaded judge config: {:?}", config);
        Ok(config)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| JudgeError::Config(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}
