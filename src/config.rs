use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::movement::{DEFAULT_LINE_THRESHOLD, DEFAULT_PRICE_THRESHOLD, MovementThresholds};
use crate::priors::LeaguePriors;

const CACHE_DIR: &str = "odds_signals";
const DB_FILE: &str = "odds.sqlite";
const DEFAULT_WORKERS: usize = 8;
const MIN_WORKERS: usize = 5;
const MAX_WORKERS: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot resolve a database path; set ODDS_DB_PATH")]
    NoDbPath,

    #[error("invalid value for {key}: {value:?}")]
    InvalidVar { key: &'static str, value: String },

    #[error("failed reading {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid league priors in {path}")]
    Priors {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub db_path: PathBuf,
    pub workers: usize,
    pub priors_path: Option<PathBuf>,
    pub thresholds: MovementThresholds,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = env::var("ODDS_DB_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .or_else(default_db_path)
            .ok_or(ConfigError::NoDbPath)?;

        let workers = env_parse::<usize>("SCORING_WORKERS")?
            .unwrap_or(DEFAULT_WORKERS)
            .clamp(MIN_WORKERS, MAX_WORKERS);

        let priors_path = env::var("LEAGUE_PRIORS_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let line = env_parse::<f64>("LINE_THRESHOLD")?.unwrap_or(DEFAULT_LINE_THRESHOLD);
        let price = env_parse::<f64>("PRICE_THRESHOLD")?.unwrap_or(DEFAULT_PRICE_THRESHOLD);
        for (key, value) in [("LINE_THRESHOLD", line), ("PRICE_THRESHOLD", price)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidVar {
                    key,
                    value: value.to_string(),
                });
            }
        }

        Ok(Self {
            db_path,
            workers,
            priors_path,
            thresholds: MovementThresholds { line, price },
        })
    }

    /// Priors from `LEAGUE_PRIORS_PATH`, or the built-in sets when unset.
    pub fn load_priors(&self) -> Result<LeaguePriors, ConfigError> {
        match self.priors_path.as_deref() {
            Some(path) => LeaguePriors::load(path),
            None => Ok(LeaguePriors::builtin()),
        }
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(DB_FILE));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(CACHE_DIR)
            .join(DB_FILE),
    )
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    let Ok(raw) = env::var(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidVar { key, value: raw })
}
