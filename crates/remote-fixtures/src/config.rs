//! Fixture configuration.
//!
//! Loaded from YAML, optionally overridden from the environment:
//!
//! ```yaml
//! timeout_ms: 10000
//! poll_interval_ms: 25
//! ui_thread_name: app-ui
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::render::DEFAULT_FALLBACK_HEIGHT;
use crate::result::{FixtureError, FixtureResult};
use crate::wait::{
    WaitOptions, DEFAULT_MAX_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Overrides `timeout_ms`
pub const ENV_TIMEOUT_MS: &str = "REMOTE_FIXTURES_TIMEOUT_MS";

/// Overrides `poll_interval_ms`
pub const ENV_POLL_INTERVAL_MS: &str = "REMOTE_FIXTURES_POLL_INTERVAL_MS";

/// Default name of the UI owner thread
pub const DEFAULT_UI_THREAD_NAME: &str = "ui-owner";

/// Resolution and extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    /// Resolution deadline in milliseconds
    pub timeout_ms: u64,
    /// Delay between resolution attempts in milliseconds
    pub poll_interval_ms: u64,
    /// Upper bound for the delay when backing off
    pub max_poll_interval_ms: u64,
    /// Delay growth factor per attempt (1.0 = fixed)
    pub backoff: f64,
    /// Height forced onto cell components before harvesting their text
    pub render_fallback_height: u32,
    /// Name of the UI owner thread
    pub ui_thread_name: String,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            backoff: 1.0,
            render_fallback_height: DEFAULT_FALLBACK_HEIGHT,
            ui_thread_name: DEFAULT_UI_THREAD_NAME.to_string(),
        }
    }
}

impl FixturesConfig {
    /// Parse and validate YAML
    pub fn from_yaml_str(yaml: &str) -> FixtureResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> FixtureResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> FixtureResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `REMOTE_FIXTURES_*` environment overrides
    pub fn with_env_overrides(self) -> FixtureResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<L>(mut self, lookup: L) -> FixtureResult<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = parse_millis(ENV_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> FixtureResult<()> {
        self.wait_options().validate()?;
        if self.render_fallback_height == 0 {
            return Err(FixtureError::config("render_fallback_height must be positive"));
        }
        if self.ui_thread_name.is_empty() {
            return Err(FixtureError::config("ui_thread_name must not be empty"));
        }
        Ok(())
    }

    /// Wait options for the resolution engine
    #[must_use]
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(self.timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
            .with_backoff(self.backoff, self.max_poll_interval_ms)
    }
}

fn parse_millis(key: &str, value: &str) -> FixtureResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| FixtureError::config(format!("{key}: expected milliseconds, got {value:?}")))
}
