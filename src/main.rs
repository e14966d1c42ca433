//! Application entry point for the `soundscape-pipeline` batch job.
//!
//! This binary turns the SONYC-UST crowd-sourced annotations into the static
//! JSON documents loaded by the soundscape visualization:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Running the pipeline (load -> aggregate -> summarize -> write)
//! - Logging a run summary with the recoverable row skips
//!
//! # Environment Variables
//! - `SOUNDSCAPE_ANNOTATIONS_CSV` (optional) – input CSV
//! - `SOUNDSCAPE_OUTPUT_DIR` (optional) – output directory
//! - `PIPELINE_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `PIPELINE_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! This module follows the Explicit Module Boundary Pattern (EMBP) by
//! delegating configuration parsing to `config`, the document layout to
//! `schema`, and the stages themselves to the `pipeline` gateway.
use std::env;

use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

mod config;
mod error;
mod models;
mod pipeline;
mod schema;

pub use config::Config;

// Re-exported so pipeline/*.rs can reach the shared types through the crate
// root instead of knowing where each one lives.
pub use error::PipelineError;
pub use models::{AnnotationRow, Category, Presence, Region};

// ---

fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let summary = pipeline::run(&cfg)?;

    tracing::info!(
        "Done: {} of {} rows used ({} unlabeled, {} invalid borough/hour), {} sensors ({} without coordinates), {} files written",
        summary.load.rows_used(),
        summary.load.total_rows,
        summary.load.skipped_unlabeled,
        summary.load.skipped_invalid_key,
        summary.sensors,
        summary.sensors_without_coordinates,
        summary.written.len()
    );

    Ok(())
}

// ---

/// Install the compact stdout subscriber. `RUST_LOG` wins over
/// `PIPELINE_LOG_LEVEL`; `PIPELINE_SPAN_EVENTS=full|enter_exit` widens the
/// span events around the `pipeline` span (close only by default) and
/// `FORCE_COLOR` overrides TTY detection.
fn init_tracing() {
    // ---
    let span_events = match env::var("PIPELINE_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1" | "true" | "yes") => true,
        Ok("0" | "false" | "no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // An unparseable directive falls back to info rather than aborting.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = env::var("PIPELINE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            EnvFilter::try_new(level)
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
