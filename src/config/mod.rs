use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

pub const BACKEND_URL_ENV: &str = "CAPTION_LOOP_BACKEND_URL";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Timing constants for the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncTimings {
    /// Clock sampling period
    pub poll_interval_ms: u64,
    /// How long samples are discarded after a programmatic seek
    pub seek_guard_ms: u64,
    /// Delay before a pause during a loop is taken as user intent
    pub pause_confirm_ms: u64,
    /// Quiet period after the last user scroll before auto-scroll resumes
    pub scroll_cooldown_ms: u64,
    /// Seconds before a looped segment's end at which playback rewinds
    pub loop_epsilon: f64,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            seek_guard_ms: 300,
            pause_confirm_ms: 300,
            scroll_cooldown_ms: 2_000,
            loop_epsilon: 0.1,
        }
    }
}

impl SyncTimings {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be positive");
        ensure!(self.seek_guard_ms > 0, "seek_guard_ms must be positive");
        ensure!(self.pause_confirm_ms > 0, "pause_confirm_ms must be positive");
        ensure!(
            self.scroll_cooldown_ms > 0,
            "scroll_cooldown_ms must be positive"
        );
        ensure!(
            self.loop_epsilon.is_finite() && (0.0..1.0).contains(&self.loop_epsilon),
            "loop_epsilon must be within [0, 1), got {}",
            self.loop_epsilon
        );
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn seek_guard(&self) -> Duration {
        Duration::from_millis(self.seek_guard_ms)
    }

    pub fn pause_confirm(&self) -> Duration {
        Duration::from_millis(self.pause_confirm_ms)
    }

    pub fn scroll_cooldown(&self) -> Duration {
        Duration::from_millis(self.scroll_cooldown_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend_url: Option<String>,
    timings: SyncTimings,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub timings: SyncTimings,
}

impl AppConfig {
    /// Resolve configuration from an optional JSON file plus overrides.
    ///
    /// Backend URL precedence: explicit override, config file, environment,
    /// built-in default.
    pub fn load(path: Option<&Path>, backend_override: Option<String>) -> Result<Self> {
        let file = match path {
            Some(path) => read_file_config(path)?,
            None => FileConfig::default(),
        };
        file.timings
            .validate()
            .context("invalid timing configuration")?;
        let backend_url = backend_override
            .or(file.backend_url)
            .or_else(|| std::env::var(BACKEND_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        ensure!(
            !backend_url.trim().is_empty(),
            "backend URL must not be empty"
        );
        Ok(Self {
            backend_url,
            timings: file.timings,
        })
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse config file {:?}", path))
}
