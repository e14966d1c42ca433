//! Stage 3: turn accumulated counts into the output documents.
//!
//! Loudness uses decibel addition: each category's reference level is taken
//! to the energy domain, scaled by how often the category is present, summed
//! over all categories and taken back to dB:
//!
//! ```text
//! db = 10 * log10( sum_c 10^(weight_c / 10) * prevalence_c )
//! ```

use std::collections::BTreeMap;

use tracing::info;

use crate::{Category, Region};
use crate::pipeline::aggregator::{Aggregates, CellSamples, HourCells, SampleCount, SensorTable};
use crate::pipeline::loader::LoadStats;
use crate::schema::{
    Artifacts, ClipIndexStub, HourlyStat, HourlyStatsDocument, Meta, SensorEntry, SkipTally,
};

// ---

/// Reported when no category is ever present in a cell.
pub const QUIET_BASELINE_DB: f64 = 55.0;

const SOURCE: &str = "SONYC-UST v2.3";
const DOI: &str = "10.5281/zenodo.3966543";
const LICENSE: &str = "CC BY 4.0";

/// Round to `decimals` places, ties to even on the exact binary value.
///
/// Fixed-precision formatting rounds the exact decimal expansion of the
/// float, so `0.03125` becomes `0.0312` rather than `0.0313`.
fn round_to(value: f64, decimals: usize) -> f64 {
    // ---
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// Share of samples marked present, 4 dp. 0.0 without samples.
pub fn prevalence(count: SampleCount) -> f64 {
    // ---
    if count.total == 0 {
        return 0.0;
    }
    round_to(count.present as f64 / count.total as f64, 4)
}

/// Energy-summed loudness estimate, 1 dp.
///
/// Categories missing from `rates` count as 0.0. Falls back to
/// [`QUIET_BASELINE_DB`] when the energy sum is zero.
pub fn loudness_db(rates: &BTreeMap<Category, f64>) -> f64 {
    // ---
    let energy: f64 = Category::ALL
        .iter()
        .map(|c| {
            let p = rates.get(c).copied().unwrap_or(0.0);
            10f64.powf(f64::from(c.db_weight()) / 10.0) * p
        })
        .sum();

    if energy > 0.0 {
        round_to(10.0 * energy.log10(), 1)
    } else {
        QUIET_BASELINE_DB
    }
}

/// Highest prevalence among categories that have samples. Ties go to the
/// category that comes first in [`Category::ALL`].
pub fn dominant(cell: &CellSamples, rates: &BTreeMap<Category, f64>) -> Option<Category> {
    // ---
    let mut best: Option<(Category, f64)> = None;

    for category in Category::ALL {
        if cell.get(category).total == 0 {
            continue;
        }
        let p = rates.get(&category).copied().unwrap_or(0.0);
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((category, p)),
        }
    }

    best.map(|(category, _)| category)
}

pub fn summarize_cell(cell: &CellSamples) -> HourlyStat {
    // ---
    let rates: BTreeMap<Category, f64> = Category::ALL
        .iter()
        .map(|c| (*c, prevalence(cell.get(*c))))
        .collect();

    let n_annotations = Category::ALL
        .iter()
        .map(|c| cell.get(*c).total)
        .max()
        .unwrap_or(0);

    HourlyStat {
        db: loudness_db(&rates),
        dominant: dominant(cell, &rates),
        n_annotations,
        prevalence: rates,
    }
}

fn summarize_hours(cells: &HourCells) -> BTreeMap<u8, HourlyStat> {
    cells.iter().map(|(hour, cell)| (*hour, summarize_cell(cell))).collect()
}

/// Build `hourly-stats.json`.
pub fn build_hourly_stats(
    aggregates: &Aggregates,
    load_stats: &LoadStats,
    clip_index_url: &str,
) -> HourlyStatsDocument {
    // ---
    let meta = Meta {
        source: SOURCE,
        doi: DOI,
        license: LICENSE,
        n_rows_total: load_stats.total_rows,
        n_rows_used: load_stats.rows_used(),
        regions: Region::ALL.iter().map(|r| (*r, r.name())).collect(),
        categories: Category::ALL.to_vec(),
        db_weights_reference: Category::ALL.iter().map(|c| (*c, c.db_weight())).collect(),
        skipped: SkipTally {
            unlabeled: load_stats.skipped_unlabeled,
            invalid_key: load_stats.skipped_invalid_key,
        },
        n_sensors_without_coordinates: aggregates.sensors.without_coordinates(),
    };

    let by_region: BTreeMap<Region, BTreeMap<u8, HourlyStat>> = aggregates
        .by_region
        .iter()
        .map(|(region, cells)| (*region, summarize_hours(cells)))
        .collect();

    let coverage: BTreeMap<Region, Vec<u8>> = aggregates
        .by_region
        .iter()
        .map(|(region, cells)| (*region, cells.keys().copied().collect()))
        .collect();

    let global = summarize_hours(&aggregates.global);
    info!(
        "  Summarized {} global hours across {} regions",
        global.len(),
        by_region.len()
    );

    HourlyStatsDocument {
        meta,
        global,
        by_region,
        coverage,
        clip_index_url: clip_index_url.to_string(),
    }
}

/// Build `sensors.json`: region ascending, then clip count descending.
/// Equal keys keep first-sighting order.
pub fn build_sensor_list(sensors: &SensorTable) -> Vec<SensorEntry> {
    // ---
    let mut list: Vec<SensorEntry> = sensors
        .records()
        .iter()
        .map(|s| SensorEntry {
            sensor_id: s.sensor_id.clone(),
            lat: s.coordinates.map(|(lat, _)| lat),
            lng: s.coordinates.map(|(_, lng)| lng),
            region: s.region.code(),
            region_name: s.region.name(),
            block: s.block.clone(),
            n_clips: s.n_clips,
        })
        .collect();

    list.sort_by(|a, b| a.region.cmp(&b.region).then(b.n_clips.cmp(&a.n_clips)));
    list
}

/// Build the placeholder `clip-index.json`.
pub fn build_clip_index_stub() -> ClipIndexStub {
    // ---
    let codes = Region::ALL
        .iter()
        .map(|r| format!("{}={}", r.code(), r.name()))
        .collect::<Vec<_>>()
        .join(", ");

    let comment = format!(
        "Stretch goal: populate with real Cloudflare R2 URLs. \
         Keys: sound_type → borough_code → clip URL. \
         Borough codes: {}.",
        codes
    );

    let entries: BTreeMap<Category, BTreeMap<Region, Option<String>>> = Category::ALL
        .iter()
        .map(|c| (*c, Region::ALL.iter().map(|r| (*r, None)).collect()))
        .collect();

    ClipIndexStub { comment, entries }
}

/// Run the whole summarizing stage.
pub fn summarize(aggregates: &Aggregates, load_stats: &LoadStats, clip_index_url: &str) -> Artifacts {
    // ---
    Artifacts {
        hourly_stats: build_hourly_stats(aggregates, load_stats, clip_index_url),
        sensors: build_sensor_list(&aggregates.sensors),
        clip_index: build_clip_index_stub(),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn all_prevalence(value: f64) -> BTreeMap<Category, f64> {
        Category::ALL.iter().map(|c| (*c, value)).collect()
    }

    #[test]
    fn test_prevalence_rounding() {
        // ---
        assert_eq!(prevalence(SampleCount { present: 0, total: 0 }), 0.0);
        assert_eq!(prevalence(SampleCount { present: 1, total: 2 }), 0.5);
        assert_eq!(prevalence(SampleCount { present: 1, total: 3 }), 0.3333);
        assert_eq!(prevalence(SampleCount { present: 2, total: 3 }), 0.6667);
        assert_eq!(prevalence(SampleCount { present: 7, total: 7 }), 1.0);
    }

    #[test]
    fn test_exact_halves_round_to_even() {
        // ---
        // 1/32 = 0.03125 and 5/32 = 0.15625 are exact in binary
        assert_eq!(prevalence(SampleCount { present: 1, total: 32 }), 0.0312);
        assert_eq!(prevalence(SampleCount { present: 5, total: 32 }), 0.1562);
        assert_eq!(prevalence(SampleCount { present: 3, total: 32 }), 0.0938);
        assert_eq!(round_to(0.25, 1), 0.2);
        assert_eq!(round_to(0.75, 1), 0.8);
    }

    #[test]
    fn test_single_voice_example() {
        // ---
        // Two annotations for voice, [1, 0], everything else unlabeled
        let cell = CellSamples::from_samples(&[(Category::Voice, vec![1, 0])]);
        let stat = summarize_cell(&cell);

        assert_eq!(stat.prevalence[&Category::Voice], 0.5);
        for c in Category::ALL.iter().filter(|c| **c != Category::Voice) {
            assert_eq!(stat.prevalence[c], 0.0);
        }
        assert_eq!(stat.prevalence.len(), 8);

        // 10*log10(10^6.5 * 0.5) = 65 - 3.0103
        assert_eq!(stat.db, 62.0);
        assert_eq!(stat.dominant, Some(Category::Voice));
        assert_eq!(stat.n_annotations, 2);
    }

    #[test]
    fn test_quiet_baseline_when_nothing_present() {
        // ---
        assert_eq!(loudness_db(&all_prevalence(0.0)), QUIET_BASELINE_DB);
        assert_eq!(loudness_db(&BTreeMap::new()), QUIET_BASELINE_DB);

        let cell = CellSamples::from_samples(&[
            (Category::Engine, vec![0, 0]),
            (Category::Dog, vec![0]),
        ]);
        let stat = summarize_cell(&cell);
        assert_eq!(stat.db, 55.0);
        // Sampled categories compete even at zero prevalence
        assert_eq!(stat.dominant, Some(Category::Engine));
        assert_eq!(stat.n_annotations, 2);
    }

    #[test]
    fn test_full_saturation() {
        // ---
        // All eight sources always present: 10*log10(sum 10^(w/10))
        let expected: f64 = Category::ALL
            .iter()
            .map(|c| 10f64.powf(f64::from(c.db_weight()) / 10.0))
            .sum::<f64>()
            .log10()
            * 10.0;
        let db = loudness_db(&all_prevalence(1.0));

        assert_eq!(db, round_to(expected, 1));
        assert!(db > 90.0, "saw alone is 90 dB, got {}", db);
    }

    #[test]
    fn test_loudness_monotone_in_each_category() {
        // ---
        let steps = [0.0, 0.1, 0.25, 0.5, 0.75, 1.0];
        for category in Category::ALL {
            let mut base = all_prevalence(0.2);
            let mut last = f64::MIN;
            for p in steps {
                base.insert(category, p);
                let db = loudness_db(&base);
                assert!(db >= last, "{:?} at {} dropped to {} from {}", category, p, db, last);
                last = db;
            }
        }
    }

    #[test]
    fn test_dominant_ties_go_to_fixed_order() {
        // ---
        let cell = CellSamples::from_samples(&[
            (Category::Dog, vec![1, 0]),
            (Category::Music, vec![1, 0]),
            (Category::Engine, vec![0, 0]),
        ]);
        let stat = summarize_cell(&cell);
        assert_eq!(stat.dominant, Some(Category::Music));

        let empty = summarize_cell(&CellSamples::default());
        assert_eq!(empty.dominant, None);
        assert_eq!(empty.n_annotations, 0);
        assert_eq!(empty.db, QUIET_BASELINE_DB);
    }

    #[test]
    fn test_prevalence_is_a_rate() {
        // ---
        let cell = CellSamples::from_samples(&[
            (Category::Engine, vec![1, 1, 1, 0]),
            (Category::Alert, vec![0, 1, 0]),
            (Category::Saw, vec![0]),
        ]);
        let stat = summarize_cell(&cell);

        for p in stat.prevalence.values() {
            assert!((0.0..=1.0).contains(p));
        }
        assert_eq!(stat.prevalence[&Category::Engine], 0.75);
        assert_eq!(stat.prevalence[&Category::Alert], 0.3333);
        assert_eq!(stat.dominant, Some(Category::Engine));
        assert_eq!(stat.n_annotations, 4);
    }

    #[test]
    fn test_clip_index_stub_shape() {
        // ---
        let stub = build_clip_index_stub();
        assert_eq!(stub.entries.len(), 8);
        for regions in stub.entries.values() {
            assert_eq!(regions.len(), 3);
            assert!(regions.values().all(|url| url.is_none()));
        }
        assert!(stub.comment.contains("1=Manhattan, 3=Brooklyn, 4=Queens"));

        let json = serde_json::to_value(&stub).unwrap();
        assert!(json["_comment"].is_string());
        assert!(json["saw"]["4"].is_null());
    }
}
