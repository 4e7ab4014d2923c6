use crate::domain::model::{DepthUnit, RoundingRule, ThresholdSet};
use serde::{Deserialize, Serialize};

/// Descriptive record of the tsunami evacuation impact function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub title: &'static str,
    pub author: &'static str,
    pub overview: &'static str,
    pub hazard_input: &'static str,
    pub exposure_input: &'static str,
    pub output: &'static str,
    pub actions: &'static str,
    pub limitations: Vec<&'static str>,
    pub hazard_units: Vec<DepthUnit>,
    pub exposure_unit: &'static str,
}

impl FunctionMetadata {
    pub fn tsunami_evacuation() -> Self {
        Self {
            id: "TsunamiEvacuationFunction",
            name: "Tsunami Evacuation Function",
            title: "Need evacuation",
            author: "AIFDR",
            overview: "To assess the impacts of tsunami inundation in raster format on population.",
            hazard_input: "A hazard raster layer where each cell represents tsunami depth (in meters).",
            exposure_input: "An exposure raster layer where each cell represent population count.",
            output: "Raster layer contains population affected and the minimum needs based on the population affected.",
            actions: "Provide details about how many people would likely need to be evacuated, where they are located and what resources would be required to support them.",
            limitations: vec![
                "The default threshold of 0.7 meter was selected based on consensus, not hard evidence.",
            ],
            hazard_units: vec![DepthUnit::Feet, DepthUnit::Metres],
            exposure_unit: "people per pixel",
        }
    }

    pub fn accepts_unit(&self, unit: DepthUnit) -> bool {
        self.hazard_units.contains(&unit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeedDefinition {
    pub name: String,
    pub unit: String,
    #[serde(default = "default_frequency")]
    pub frequency: String,
    /// Amount per affected person.
    pub per_person: f64,
    #[serde(default)]
    pub rounding: RoundingRule,
}

fn default_frequency() -> String {
    "weekly".to_string()
}

impl NeedDefinition {
    pub fn new(name: &str, unit: &str, frequency: &str, per_person: f64, rounding: RoundingRule) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            frequency: frequency.to_string(),
            per_person,
            rounding,
        }
    }
}

/// Minimum-needs catalog entry set, in reporting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeedsProfile {
    pub name: String,
    pub needs: Vec<NeedDefinition>,
}

impl NeedsProfile {
    /// BNPB Perka 7/2008 minimum needs.
    pub fn bnpb_default() -> Self {
        Self {
            name: "BNPB_en".to_string(),
            needs: vec![
                NeedDefinition::new("Rice", "kg", "weekly", 2.8, RoundingRule::Nearest),
                NeedDefinition::new("Drinking Water", "litre", "weekly", 17.5, RoundingRule::Nearest),
                NeedDefinition::new("Clean Water", "litre", "weekly", 67.0, RoundingRule::Nearest),
                NeedDefinition::new("Family Kits", "unit", "single", 0.2, RoundingRule::Nearest),
                NeedDefinition::new("Toilets", "unit", "single", 0.05, RoundingRule::Up),
            ],
        }
    }

    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            needs: Vec::new(),
        }
    }
}

impl Default for NeedsProfile {
    fn default() -> Self {
        Self::bnpb_default()
    }
}

/// Everything the engine needs besides the two rasters.
#[derive(Debug, Clone)]
pub struct ImpactFunctionConfig {
    pub metadata: FunctionMetadata,
    pub thresholds: ThresholdSet,
    pub needs_profile: NeedsProfile,
    /// Row-tile workers for classification; `1` runs inline.
    pub worker_threads: usize,
    /// Rows per tile.
    pub tile_rows: usize,
}

impl ImpactFunctionConfig {
    pub const DEFAULT_TILE_ROWS: usize = 256;

    pub fn new(thresholds: ThresholdSet, needs_profile: NeedsProfile) -> Self {
        Self {
            metadata: FunctionMetadata::tsunami_evacuation(),
            thresholds,
            needs_profile,
            worker_threads: 1,
            tile_rows: Self::DEFAULT_TILE_ROWS,
        }
    }

    pub fn with_workers(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads.max(1);
        self
    }

    pub fn with_tile_rows(mut self, tile_rows: usize) -> Self {
        self.tile_rows = tile_rows.max(1);
        self
    }
}

impl Default for ImpactFunctionConfig {
    fn default() -> Self {
        Self::new(ThresholdSet::default(), NeedsProfile::bnpb_default())
    }
}

/// Which postprocessors run after `compute`, with their demographic ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PostprocessorSettings {
    #[serde(default)]
    pub gender: Option<GenderRatios>,
    #[serde(default)]
    pub age: Option<AgeRatios>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderRatios {
    pub female: f64,
}

impl Default for GenderRatios {
    fn default() -> Self {
        Self { female: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeRatios {
    pub youth: f64,
    pub adult: f64,
    pub elderly: f64,
}

impl Default for AgeRatios {
    fn default() -> Self {
        Self {
            youth: 0.263,
            adult: 0.659,
            elderly: 0.078,
        }
    }
}
