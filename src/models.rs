//! Domain models for the soundscape annotation pipeline.

use serde::Serialize;

// ---

/// Coarse urban sound category as annotated in SONYC-UST.
///
/// Declaration order is the fixed category order used for output keys and
/// for breaking ties when picking the dominant category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Engine,
    Machinery,
    Impact,
    Saw,
    Alert,
    Music,
    Voice,
    Dog,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Engine,
        Category::Machinery,
        Category::Impact,
        Category::Saw,
        Category::Alert,
        Category::Music,
        Category::Voice,
        Category::Dog,
    ];

    /// Presence column carrying this category in `annotations.csv`.
    pub fn column(self) -> &'static str {
        // ---
        match self {
            Category::Engine => "1_engine_presence",
            Category::Machinery => "2_machinery-impact_presence",
            Category::Impact => "3_non-machinery-impact_presence",
            Category::Saw => "4_powered-saw_presence",
            Category::Alert => "5_alert-signal_presence",
            Category::Music => "6_music_presence",
            Category::Voice => "7_human-voice_presence",
            Category::Dog => "8_dog_presence",
        }
    }

    pub fn key(self) -> &'static str {
        // ---
        match self {
            Category::Engine => "engine",
            Category::Machinery => "machinery",
            Category::Impact => "impact",
            Category::Saw => "saw",
            Category::Alert => "alert",
            Category::Music => "music",
            Category::Voice => "voice",
            Category::Dog => "dog",
        }
    }

    /// Typical level in dB for this kind of source (WHO noise guidelines,
    /// NYC DEP noise data). Only used for the loudness estimate.
    pub fn db_weight(self) -> u32 {
        // ---
        match self {
            Category::Engine => 78,
            Category::Machinery => 88,
            Category::Impact => 82,
            Category::Saw => 90,
            Category::Alert => 80,
            Category::Music => 70,
            Category::Voice => 65,
            Category::Dog => 72,
        }
    }

    /// Position in [`Category::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// NYC borough covered by the sensor network.
///
/// Serialized as its numeric code string so it can key JSON objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Region {
    #[serde(rename = "1")]
    Manhattan,
    #[serde(rename = "3")]
    Brooklyn,
    #[serde(rename = "4")]
    Queens,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Manhattan, Region::Brooklyn, Region::Queens];

    /// Parse a `borough` cell. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Region> {
        // ---
        match code.trim() {
            "1" => Some(Region::Manhattan),
            "3" => Some(Region::Brooklyn),
            "4" => Some(Region::Queens),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        // ---
        match self {
            Region::Manhattan => 1,
            Region::Brooklyn => 3,
            Region::Queens => 4,
        }
    }

    pub fn name(self) -> &'static str {
        // ---
        match self {
            Region::Manhattan => "Manhattan",
            Region::Brooklyn => "Brooklyn",
            Region::Queens => "Queens",
        }
    }
}

/// Tri-state annotator answer for one category on one clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
    /// `-1`: the annotator did not evaluate this category.
    NotEvaluated,
    /// Anything else found in the cell (blank, typo).
    Unusable,
}

impl Presence {
    pub fn parse(cell: &str) -> Presence {
        // ---
        match cell.trim() {
            "1" => Presence::Present,
            "0" => Presence::Absent,
            "-1" => Presence::NotEvaluated,
            _ => Presence::Unusable,
        }
    }

    /// The 0/1 sample this value contributes, if any.
    pub fn sample(self) -> Option<u8> {
        // ---
        match self {
            Presence::Present => Some(1),
            Presence::Absent => Some(0),
            Presence::NotEvaluated | Presence::Unusable => None,
        }
    }
}

/// One accepted annotation record.
#[derive(Debug, Clone)]
pub struct AnnotationRow {
    // ---
    pub region: Region,
    pub hour: u8,
    pub sensor_id: String,
    /// `(lat, lng)`, only when both parse as finite numbers.
    pub coordinates: Option<(f64, f64)>,
    pub block: String,
    /// Indexed by [`Category::index`].
    pub presence: [Presence; 8],
}

impl AnnotationRow {
    pub fn presence_of(&self, category: Category) -> Presence {
        self.presence[category.index()]
    }
}
