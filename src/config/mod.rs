//! Configuration for stackland
//!
//! Layered: built-in defaults, user file, repository file, CLI overrides.

mod storage;

pub use storage::{git_dir, load_config, repo_config_path, save_repo_config, user_config_path};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resolved configuration for one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trunk branch name
    pub trunk: String,
    /// Remote that hosts trunk and PR branches
    pub remote: String,
    /// External tool binaries
    pub tools: ToolConfig,
    /// Read-after-write polling schedules
    pub poll: PollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trunk: "main".to_string(),
            remote: "origin".to_string(),
            tools: ToolConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

/// Names (or paths) of the external tools the ports invoke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// git binary
    pub git: String,
    /// Stack-graph tool binary
    pub stack: String,
    /// Code-host CLI binary
    pub host: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            stack: "gt".to_string(),
            host: "gh".to_string(),
        }
    }
}

/// Delay schedules, in seconds, for the consistency poller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Schedule used after submits
    pub standard: Vec<f64>,
    /// Schedule used on latency-sensitive paths (cascade repair)
    pub fast: Vec<f64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            standard: vec![1.0, 2.0, 4.0],
            fast: vec![0.5, 1.0],
        }
    }
}

impl PollConfig {
    /// Standard schedule as durations
    pub fn standard_delays(&self) -> Result<Vec<Duration>> {
        to_durations("poll.standard", &self.standard)
    }

    /// Fast schedule as durations
    pub fn fast_delays(&self) -> Result<Vec<Duration>> {
        to_durations("poll.fast", &self.fast)
    }

    /// Reject any delay that is not a representable, non-negative duration
    pub fn validate(&self) -> Result<()> {
        self.standard_delays()?;
        self.fast_delays()?;
        Ok(())
    }
}

fn to_durations(key: &str, secs: &[f64]) -> Result<Vec<Duration>> {
    secs.iter()
        .map(|s| {
            Duration::try_from_secs_f64(*s)
                .map_err(|e| Error::Config(format!("invalid delay {s} in {key}: {e}")))
        })
        .collect()
}

/// Values given on the command line; `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--trunk`
    pub trunk: Option<String>,
    /// `--remote`
    pub remote: Option<String>,
}

impl Config {
    /// Apply command-line overrides on top of loaded values
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(trunk) = &overrides.trunk {
            self.trunk.clone_from(trunk);
        }
        if let Some(remote) = &overrides.remote {
            self.remote.clone_from(remote);
        }
        self
    }

    /// Remote-tracking ref for trunk, e.g. `origin/main`
    pub fn remote_trunk(&self) -> String {
        format!("{}/{}", self.remote, self.trunk)
    }
}
