//! Pipeline gateway (EMBP).
//!
//! The stage modules are private siblings; `main.rs` only sees [`run`] and
//! the [`RunSummary`] it returns. Each stage is a plain data transformation:
//! rows -> aggregates -> documents -> files.

use std::path::PathBuf;

use tracing::{info, info_span, warn};

use crate::{Config, PipelineError};

mod aggregator;
mod loader;
mod report;
mod summarizer;
mod writer;

pub use loader::LoadStats;

// ---

/// What a finished run did, for the final log lines.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub load: LoadStats,
    pub sensors: usize,
    pub sensors_without_coordinates: usize,
    pub written: Vec<PathBuf>,
}

/// Execute one full pass: load, aggregate, summarize, write, report.
pub fn run(cfg: &Config) -> Result<RunSummary, PipelineError> {
    // ---
    let span = info_span!("pipeline", input = %cfg.annotations_csv.display());
    let _guard = span.enter();

    let loaded = loader::load_from_path(&cfg.annotations_csv)?;

    let aggregates = aggregator::aggregate(&loaded.rows);
    let sensors_without_coordinates = aggregates.sensors.without_coordinates();
    if sensors_without_coordinates > 0 {
        warn!(
            "{} sensors have no usable coordinates and are listed without lat/lng",
            sensors_without_coordinates
        );
    }

    info!("Building output documents ...");
    let artifacts = summarizer::summarize(&aggregates, &loaded.stats, &cfg.clip_index_url);

    info!("Writing to {} ...", cfg.output_dir.display());
    let written = writer::write_artifacts(&cfg.output_dir, &artifacts)?;
    info!("  Sensors: {} unique sensors", artifacts.sensors.len());

    report::log_sanity_check(&artifacts.hourly_stats, cfg.report_hour);

    Ok(RunSummary {
        load: loaded.stats,
        sensors: aggregates.sensors.len(),
        sensors_without_coordinates,
        written,
    })
}
