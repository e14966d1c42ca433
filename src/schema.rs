//! Output document schema for `soundscape-pipeline`.
//!
//! These types are the contract with the front-end: their field names and
//! nesting are exactly what ends up in the JSON files under the output
//! directory. Maps are `BTreeMap`s so key order (hours numerically, regions
//! by code, categories in fixed order) and therefore the bytes written are
//! stable across runs.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Category, Region};

// ---

/// Summary for one (scope, hour).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyStat {
    // ---
    /// Every category, 0.0 where no samples were recorded.
    pub prevalence: BTreeMap<Category, f64>,
    /// Estimated level from energy summation of the reference weights.
    pub db: f64,
    /// `null` when no category has samples.
    pub dominant: Option<Category>,
    /// Largest per-category sample count; a coverage proxy, not a row count.
    pub n_annotations: u64,
}

/// Recoverable row skips, by reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkipTally {
    pub unlabeled: u64,
    pub invalid_key: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meta {
    // ---
    pub source: &'static str,
    pub doi: &'static str,
    pub license: &'static str,
    pub n_rows_total: u64,
    pub n_rows_used: u64,
    pub regions: BTreeMap<Region, &'static str>,
    pub categories: Vec<Category>,
    pub db_weights_reference: BTreeMap<Category, u32>,
    pub skipped: SkipTally,
    pub n_sensors_without_coordinates: usize,
}

/// `hourly-stats.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyStatsDocument {
    // ---
    pub meta: Meta,
    pub global: BTreeMap<u8, HourlyStat>,
    pub by_region: BTreeMap<Region, BTreeMap<u8, HourlyStat>>,
    /// Hours with any data, per region.
    pub coverage: BTreeMap<Region, Vec<u8>>,
    pub clip_index_url: String,
}

/// One element of `sensors.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorEntry {
    // ---
    pub sensor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Numeric borough code.
    pub region: u8,
    pub region_name: &'static str,
    pub block: String,
    pub n_clips: u64,
}

/// `clip-index.json`: category -> region code -> clip URL, all unset for now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipIndexStub {
    #[serde(rename = "_comment")]
    pub comment: String,
    #[serde(flatten)]
    pub entries: BTreeMap<Category, BTreeMap<Region, Option<String>>>,
}

/// The three documents produced by one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub hourly_stats: HourlyStatsDocument,
    pub sensors: Vec<SensorEntry>,
    pub clip_index: ClipIndexStub,
}
