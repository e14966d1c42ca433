//! Stage 2: accumulate presence samples and the sensor table.
//!
//! A cell only stores how many 0/1 samples it saw and how many of them were
//! 1, so the order rows arrive in cannot change any statistic.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::{AnnotationRow, Category, Region};

// ---

/// Sample counts for one (scope, hour, category).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleCount {
    pub present: u64,
    pub total: u64,
}

impl SampleCount {
    fn push(&mut self, sample: u8) {
        self.present += u64::from(sample);
        self.total += 1;
    }
}

/// All category samples for one (scope, hour).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellSamples {
    counts: [SampleCount; 8],
}

impl CellSamples {
    pub fn get(&self, category: Category) -> SampleCount {
        self.counts[category.index()]
    }

    fn push(&mut self, category: Category, sample: u8) {
        self.counts[category.index()].push(sample);
    }

    #[cfg(test)]
    pub(crate) fn from_samples(samples: &[(Category, Vec<u8>)]) -> Self {
        // ---
        let mut cell = CellSamples::default();
        for (category, values) in samples {
            for v in values {
                cell.push(*category, *v);
            }
        }
        cell
    }
}

/// Hour of day -> cell.
pub type HourCells = BTreeMap<u8, CellSamples>;

/// A unique sensor device. Identity fields come from the first row that
/// names the sensor and never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    // ---
    pub sensor_id: String,
    pub coordinates: Option<(f64, f64)>,
    pub region: Region,
    pub block: String,
    pub n_clips: u64,
}

/// Sensors in first-sighting order.
#[derive(Debug, Default)]
pub struct SensorTable {
    index: HashMap<String, usize>,
    records: Vec<SensorRecord>,
}

impl SensorTable {
    fn observe(&mut self, row: &AnnotationRow) {
        // ---
        if row.sensor_id.is_empty() {
            return;
        }

        let slot = match self.index.get(&row.sensor_id) {
            Some(slot) => *slot,
            None => {
                if row.coordinates.is_none() {
                    debug!("Sensor {} first seen without usable coordinates", row.sensor_id);
                }
                self.records.push(SensorRecord {
                    sensor_id: row.sensor_id.clone(),
                    coordinates: row.coordinates,
                    region: row.region,
                    block: row.block.clone(),
                    n_clips: 0,
                });
                self.index.insert(row.sensor_id.clone(), self.records.len() - 1);
                self.records.len() - 1
            }
        };

        self.records[slot].n_clips += 1;
    }

    #[cfg(test)]
    pub fn get(&self, sensor_id: &str) -> Option<&SensorRecord> {
        self.index.get(sensor_id).map(|slot| &self.records[*slot])
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn without_coordinates(&self) -> usize {
        self.records.iter().filter(|s| s.coordinates.is_none()).count()
    }
}

/// Everything the summarizer needs.
#[derive(Debug, Default)]
pub struct Aggregates {
    pub by_region: BTreeMap<Region, HourCells>,
    pub global: HourCells,
    pub sensors: SensorTable,
}

impl Aggregates {
    /// Fold one accepted row into the accumulators.
    pub fn add_row(&mut self, row: &AnnotationRow) {
        // ---
        self.sensors.observe(row);

        for category in Category::ALL {
            let Some(sample) = row.presence_of(category).sample() else {
                continue;
            };
            self.by_region
                .entry(row.region)
                .or_default()
                .entry(row.hour)
                .or_default()
                .push(category, sample);
            self.global.entry(row.hour).or_default().push(category, sample);
        }
    }
}

/// Run the aggregation pass over the accepted rows.
pub fn aggregate<'a, I>(rows: I) -> Aggregates
where
    I: IntoIterator<Item = &'a AnnotationRow>,
{
    // ---
    let mut aggregates = Aggregates::default();
    for row in rows {
        aggregates.add_row(row);
    }

    info!("  Unique sensors: {}", aggregates.sensors.len());
    debug!(
        "  Cells: {} global hours, {} regions",
        aggregates.global.len(),
        aggregates.by_region.len()
    );

    aggregates
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::Presence;

    fn make_row(region: Region, hour: u8, sensor: &str, labels: [i8; 8]) -> AnnotationRow {
        // ---
        let presence = labels.map(|v| match v {
            1 => Presence::Present,
            0 => Presence::Absent,
            -1 => Presence::NotEvaluated,
            _ => Presence::Unusable,
        });
        AnnotationRow {
            region,
            hour,
            sensor_id: sensor.to_string(),
            coordinates: Some((40.7, -73.9)),
            block: "1001".to_string(),
            presence,
        }
    }

    #[test]
    fn test_only_evaluated_categories_contribute() {
        // ---
        let rows = vec![
            make_row(Region::Manhattan, 8, "S1", [-1, -1, -1, -1, -1, -1, 1, -1]),
            make_row(Region::Manhattan, 8, "S1", [-1, -1, -1, -1, -1, -1, 0, -1]),
            make_row(Region::Manhattan, 8, "S1", [1, -1, -1, -1, -1, -1, -1, 9]),
        ];
        let agg = aggregate(&rows);

        let cell = &agg.by_region[&Region::Manhattan][&8];
        assert_eq!(cell.get(Category::Voice), SampleCount { present: 1, total: 2 });
        assert_eq!(cell.get(Category::Engine), SampleCount { present: 1, total: 1 });
        assert_eq!(cell.get(Category::Dog), SampleCount::default());
        assert_eq!(cell.get(Category::Music), SampleCount::default());
    }

    #[test]
    fn test_global_cells_span_regions() {
        // ---
        let rows = vec![
            make_row(Region::Manhattan, 17, "S1", [1, 0, 0, 0, 0, 0, 0, 0]),
            make_row(Region::Brooklyn, 17, "S2", [0, 0, 0, 0, 0, 0, 0, 0]),
            make_row(Region::Queens, 3, "S3", [1, 1, 1, 1, 1, 1, 1, 1]),
        ];
        let agg = aggregate(&rows);

        assert_eq!(agg.by_region.len(), 3);
        assert_eq!(agg.global.keys().copied().collect::<Vec<_>>(), vec![3, 17]);
        assert_eq!(
            agg.global[&17].get(Category::Engine),
            SampleCount { present: 1, total: 2 }
        );
        assert!(!agg.by_region[&Region::Brooklyn].contains_key(&3));
    }

    #[test]
    fn test_hours_without_samples_create_no_cell() {
        // ---
        let rows = vec![make_row(Region::Queens, 5, "S1", [9, 9, 9, 9, 9, 9, 9, -1])];
        let agg = aggregate(&rows);

        assert!(agg.global.is_empty());
        assert!(agg.by_region.is_empty());
        // The clip still counts towards its sensor
        assert_eq!(agg.sensors.get("S1").unwrap().n_clips, 1);
    }

    #[test]
    fn test_row_order_does_not_matter() {
        // ---
        let mut rows = vec![
            make_row(Region::Manhattan, 8, "S1", [1, 0, -1, -1, -1, -1, 1, 0]),
            make_row(Region::Brooklyn, 8, "S2", [0, 1, 1, -1, -1, -1, 0, 0]),
            make_row(Region::Manhattan, 9, "S1", [0, 0, 0, 1, -1, -1, -1, -1]),
        ];
        let forward = aggregate(&rows);
        rows.reverse();
        let backward = aggregate(&rows);

        assert_eq!(forward.global, backward.global);
        assert_eq!(forward.by_region, backward.by_region);
    }

    #[test]
    fn test_sensor_identity_is_first_write_wins() {
        // ---
        let mut first = make_row(Region::Brooklyn, 8, "S1", [1, 0, 0, 0, 0, 0, 0, 0]);
        first.coordinates = None;
        let mut later = make_row(Region::Queens, 9, "S1", [1, 0, 0, 0, 0, 0, 0, 0]);
        later.block = "2002".to_string();
        let other = make_row(Region::Manhattan, 9, "S2", [1, 0, 0, 0, 0, 0, 0, 0]);

        let agg = aggregate(&[first, later.clone(), later, other]);

        let s1 = agg.sensors.get("S1").unwrap();
        assert_eq!(s1.n_clips, 3);
        assert_eq!(s1.coordinates, None);
        assert_eq!(s1.region, Region::Brooklyn);
        assert_eq!(s1.block, "1001");

        assert_eq!(agg.sensors.len(), 2);
        assert_eq!(agg.sensors.without_coordinates(), 1);
        assert_eq!(agg.sensors.records()[1].sensor_id, "S2");
    }

    #[test]
    fn test_empty_sensor_id_is_ignored() {
        // ---
        let rows = vec![make_row(Region::Manhattan, 8, "", [1, 0, 0, 0, 0, 0, 0, 0])];
        let agg = aggregate(&rows);

        assert_eq!(agg.sensors.len(), 0);
        assert_eq!(agg.global[&8].get(Category::Engine).total, 1);
    }
}
