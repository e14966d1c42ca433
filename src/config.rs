//! Configuration loader for the `soundscape-pipeline` batch job.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Every value has a default, so a bare run reads
//! `data/metadata/annotations.csv` and writes into `data/processed/`.
//!
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, ensure, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| $default.to_string())
    };
}

/// Strongly typed pipeline configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the whole run.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// SONYC-UST `annotations.csv` to read.
    pub annotations_csv: PathBuf,

    /// Directory receiving the three JSON documents.
    pub output_dir: PathBuf,

    /// Value of `clip_index_url` in `hourly-stats.json`.
    pub clip_index_url: String,

    /// Hour of day logged by the post-run sanity check.
    pub report_hour: u8,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `SOUNDSCAPE_ANNOTATIONS_CSV` – input file (default: `data/metadata/annotations.csv`)
/// - `SOUNDSCAPE_OUTPUT_DIR` – output directory (default: `data/processed`)
/// - `SOUNDSCAPE_CLIP_INDEX_URL` – clip index reference (default: `./clip-index.json`)
/// - `SOUNDSCAPE_REPORT_HOUR` – sanity check hour, 0–23 (default: 8)
///
/// Returns an error if any variable is set to an invalid value.
pub fn load_from_env() -> Result<Config> {
    // ---
    let annotations_csv = PathBuf::from(env_or!(
        "SOUNDSCAPE_ANNOTATIONS_CSV",
        "data/metadata/annotations.csv"
    ));
    let output_dir = PathBuf::from(env_or!("SOUNDSCAPE_OUTPUT_DIR", "data/processed"));
    let clip_index_url = env_or!("SOUNDSCAPE_CLIP_INDEX_URL", "./clip-index.json");
    let report_hour = parse_env_u32!("SOUNDSCAPE_REPORT_HOUR", 8);

    ensure!(
        report_hour <= 23,
        "Invalid SOUNDSCAPE_REPORT_HOUR: {} is not an hour of day (0-23)",
        report_hour
    );

    Ok(Config {
        annotations_csv,
        output_dir,
        clip_index_url,
        report_hour: report_hour as u8,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  SOUNDSCAPE_ANNOTATIONS_CSV : {}", self.annotations_csv.display());
        tracing::info!("  SOUNDSCAPE_OUTPUT_DIR      : {}", self.output_dir.display());
        tracing::info!("  SOUNDSCAPE_CLIP_INDEX_URL  : {}", self.clip_index_url);
        tracing::info!("  SOUNDSCAPE_REPORT_HOUR     : {}", self.report_hour);
    }
}
