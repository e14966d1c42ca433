//! Stage 1: read `annotations.csv`, validate the header and filter rows.
//!
//! Filtering happens in a fixed order. A row whose category cells are all
//! `-1` is skipped as unlabeled before its region and hour are even looked
//! at; a labeled row with an empty/unknown borough or an unusable hour is
//! skipped as an invalid key. Neither aborts the run.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, trace};

use crate::{AnnotationRow, Category, PipelineError, Presence, Region};

// ---

const COL_BOROUGH: &str = "borough";
const COL_HOUR: &str = "hour";
const COL_SENSOR_ID: &str = "sensor_id";
const COL_LATITUDE: &str = "latitude";
const COL_LONGITUDE: &str = "longitude";
const COL_BLOCK: &str = "block";

/// Row tallies reported after loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    // ---
    pub total_rows: u64,
    /// Every category marked `-1`.
    pub skipped_unlabeled: u64,
    /// Empty or unknown borough, empty or out-of-range hour.
    pub skipped_invalid_key: u64,
}

impl LoadStats {
    pub fn skipped(&self) -> u64 {
        self.skipped_unlabeled + self.skipped_invalid_key
    }

    pub fn rows_used(&self) -> u64 {
        self.total_rows - self.skipped()
    }
}

/// Accepted rows in input order plus the tallies.
#[derive(Debug)]
pub struct LoadedAnnotations {
    pub rows: Vec<AnnotationRow>,
    pub stats: LoadStats,
}

/// Positions of every required column in the header.
#[derive(Debug)]
struct ColumnIndex {
    // ---
    borough: usize,
    hour: usize,
    sensor_id: usize,
    latitude: usize,
    longitude: usize,
    block: usize,
    categories: [usize; 8],
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self, PipelineError> {
        // ---
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PipelineError::MissingColumn {
                    column: name.to_string(),
                })
        };

        // Category columns first so a wrong dataset is reported by the
        // column that identifies it.
        let mut categories = [0usize; 8];
        for category in Category::ALL {
            categories[category.index()] = find(category.column())?;
        }

        Ok(ColumnIndex {
            borough: find(COL_BOROUGH)?,
            hour: find(COL_HOUR)?,
            sensor_id: find(COL_SENSOR_ID)?,
            latitude: find(COL_LATITUDE)?,
            longitude: find(COL_LONGITUDE)?,
            block: find(COL_BLOCK)?,
            categories,
        })
    }
}

/// Why a single record did not make it into the accepted set.
#[derive(Debug, PartialEq, Eq)]
enum Rejection {
    Unlabeled,
    InvalidKey,
}

// ---

/// Open and load the annotations file at `path`.
pub fn load_from_path(path: &Path) -> Result<LoadedAnnotations, PipelineError> {
    // ---
    info!("Reading {} ...", path.display());

    let file = File::open(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_annotations(BufReader::new(file), path)
}

/// Load annotations from any reader; `source` is only used in error
/// messages.
pub fn load_annotations<R: io::Read>(
    reader: R,
    source: &Path,
) -> Result<LoadedAnnotations, PipelineError> {
    // ---
    let csv_error = |e: csv::Error| PipelineError::Csv {
        path: source.to_path_buf(),
        source: e,
    };

    // Short rows are tolerated; missing trailing cells read as empty.
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnIndex::resolve(rdr.headers().map_err(csv_error)?)?;
    debug!("Resolved column positions: {:?}", columns);

    let mut stats = LoadStats::default();
    let mut rows = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_error)?;
        stats.total_rows += 1;

        match parse_record(&record, &columns) {
            Ok(row) => rows.push(row),
            Err(Rejection::Unlabeled) => {
                trace!("Row {} skipped: all categories unlabeled", i + 1);
                stats.skipped_unlabeled += 1;
            }
            Err(Rejection::InvalidKey) => {
                trace!("Row {} skipped: missing or invalid borough/hour", i + 1);
                stats.skipped_invalid_key += 1;
            }
        }
    }

    info!("  Total rows: {}", stats.total_rows);
    info!(
        "  Skipped: {} ({} all-unlabeled, {} invalid borough/hour)",
        stats.skipped(),
        stats.skipped_unlabeled,
        stats.skipped_invalid_key
    );

    Ok(LoadedAnnotations { rows, stats })
}

fn parse_record(record: &StringRecord, columns: &ColumnIndex) -> Result<AnnotationRow, Rejection> {
    // ---
    let field = |idx: usize| record.get(idx).unwrap_or("").trim();

    let mut presence = [Presence::NotEvaluated; 8];
    for category in Category::ALL {
        presence[category.index()] = Presence::parse(field(columns.categories[category.index()]));
    }
    if presence.iter().all(|p| *p == Presence::NotEvaluated) {
        return Err(Rejection::Unlabeled);
    }

    let region = Region::from_code(field(columns.borough)).ok_or(Rejection::InvalidKey)?;
    let hour = parse_hour(field(columns.hour)).ok_or(Rejection::InvalidKey)?;

    Ok(AnnotationRow {
        region,
        hour,
        sensor_id: field(columns.sensor_id).to_string(),
        coordinates: parse_coordinates(field(columns.latitude), field(columns.longitude)),
        block: field(columns.block).to_string(),
        presence,
    })
}

/// Plain decimal digits only; zero-padded values like `08` read as hour 8.
fn parse_hour(cell: &str) -> Option<u8> {
    // ---
    if cell.is_empty() || !cell.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    cell.parse::<u8>().ok().filter(|h| *h <= 23)
}

fn parse_coordinates(lat: &str, lng: &str) -> Option<(f64, f64)> {
    // ---
    let parse = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite());
    Some((parse(lat)?, parse(lng)?))
}
