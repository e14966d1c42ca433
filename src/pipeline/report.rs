//! Post-run sanity check: a quick look at one hour of the finished document.

use tracing::info;

use crate::{Category, Region};
use crate::schema::{HourlyStat, HourlyStatsDocument};

// ---

/// Categories of `stat` by descending prevalence; equal rates keep the
/// fixed category order.
pub fn top_categories(stat: &HourlyStat, n: usize) -> Vec<(Category, f64)> {
    // ---
    let mut ranked: Vec<(Category, f64)> = stat.prevalence.iter().map(|(c, p)| (*c, *p)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    ranked
}

fn dominant_label(stat: &HourlyStat) -> &'static str {
    stat.dominant.map(Category::key).unwrap_or("none")
}

/// Log the global and per-region figures for `hour`. Hours without data
/// are skipped.
pub fn log_sanity_check(doc: &HourlyStatsDocument, hour: u8) {
    // ---
    info!("── Sanity check ───────────────────────────────────────────");

    match doc.global.get(&hour) {
        Some(g) => {
            info!("Global hour {}:", hour);
            info!("  dB estimate: {} dB", g.db);
            info!("  Dominant sound: {}", dominant_label(g));
            for (category, rate) in top_categories(g, 4) {
                info!("  {:12}: {:.1}%", category.key(), rate * 100.0);
            }
        }
        None => info!("Global hour {}: no data", hour),
    }

    info!("Per-region hour {}:", hour);
    for region in Region::ALL {
        if let Some(s) = doc.by_region.get(&region).and_then(|hours| hours.get(&hour)) {
            info!(
                "  {:12}: {} dB, dominant={}, n={}",
                region.name(),
                s.db,
                dominant_label(s),
                s.n_annotations
            );
        }
    }
}
