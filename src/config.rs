use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration: where the database lives and how the tuner
/// explores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub tuner: TunerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection string, e.g. `host=localhost user=app dbname=shop`.
    pub url: Option<String>,
    /// Path to a SQLite file; takes precedence over `url` when both are set.
    pub sqlite_path: Option<PathBuf>,
}

/// Tuning hyperparameters and safety limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Q-learning rate.
    pub alpha: f64,
    /// Discount factor; 0 gives a pure bandit update.
    pub gamma: f64,
    /// Exploration probability.
    pub epsilon: f64,
    /// Upper bound on the candidate-action catalog, no-op included.
    pub max_actions: usize,
    /// Latency charged for a failed query execution, in seconds.
    pub penalty_latency_secs: f64,
    /// Default episode budget per training run.
    pub episodes: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            gamma: 0.9,
            epsilon: 0.3,
            max_actions: 12,
            penalty_latency_secs: 10.0,
            episodes: 4,
        }
    }
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    }

    /// Resolve configuration: explicit path, then `INDEXPILOT_CONFIG`, then
    /// the platform config dir, then built-in defaults.
    pub fn resolve(cli_config: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_config {
            return Self::load_from_file(path);
        }
        if let Ok(path) = std::env::var("INDEXPILOT_CONFIG") {
            return Self::load_from_file(path);
        }
        if let Some(dirs) = directories::ProjectDirs::from("", "", "indexpilot") {
            let path = dirs.config_dir().join("config.toml");
            if path.exists() {
                return Self::load_from_file(path);
            }
        }
        Ok(Self::default())
    }
}
