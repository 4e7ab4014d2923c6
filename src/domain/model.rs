use crate::utils::error::{ImpactError, Result};
use serde::{Deserialize, Serialize};

/// Sentinel written to output rasters when no input sentinel is available.
pub const DEFAULT_NODATA: f64 = -9999.0;

const FEET_TO_METRES: f64 = 0.3048;

/// Axis-aligned geotransform. `origin_x`/`origin_y` locate the top-left corner
/// of cell (0, 0); `cell_height` is negative for north-up grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, cell_width: f64, cell_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            cell_width,
            cell_height,
        }
    }

    /// North-up transform with square cells.
    pub fn north_up(origin_x: f64, origin_y: f64, cell_size: f64) -> Self {
        Self::new(origin_x, origin_y, cell_size, -cell_size)
    }

    pub fn cell_area(&self) -> f64 {
        (self.cell_width * self.cell_height).abs()
    }
}

/// Bounding box in map units, `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        let min_x = self.min_x.max(other.min_x);
        let max_x = self.max_x.min(other.max_x);
        let min_y = self.min_y.max(other.min_y);
        let max_y = self.max_y.min(other.max_y);
        if min_x < max_x && min_y < max_y {
            Some(Extent {
                min_x,
                min_y,
                max_x,
                max_y,
            })
        } else {
            None
        }
    }

    pub fn area(&self) -> f64 {
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    #[serde(default)]
    pub crs: Option<String>,
    pub values: Vec<f64>,
}

impl Raster {
    pub fn new(
        name: impl Into<String>,
        width: usize,
        height: usize,
        transform: GeoTransform,
        nodata: Option<f64>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let raster = Self {
            name: name.into(),
            width,
            height,
            transform,
            nodata,
            crs: None,
            values,
        };
        raster.check_shape()?;
        Ok(raster)
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    /// Grid sharing `template`'s geometry, every cell set to `fill`.
    pub fn filled_like(template: &Raster, name: impl Into<String>, fill: f64, nodata: Option<f64>) -> Self {
        Self {
            name: name.into(),
            width: template.width,
            height: template.height,
            transform: template.transform,
            nodata,
            crs: template.crs.clone(),
            values: vec![fill; template.width * template.height],
        }
    }

    pub fn check_shape(&self) -> Result<()> {
        let shape_error = |reason: String| ImpactError::RasterShapeError {
            raster: self.name.clone(),
            reason,
        };

        if self.width == 0 || self.height == 0 {
            return Err(shape_error(format!(
                "dimensions {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        let expected = self
            .width
            .checked_mul(self.height)
            .ok_or_else(|| shape_error("dimensions overflow".to_string()))?;
        if expected != self.values.len() {
            return Err(shape_error(format!(
                "declared {}x{} = {} cells but buffer holds {}",
                self.width,
                self.height,
                expected,
                self.values.len()
            )));
        }

        let t = &self.transform;
        if !(t.cell_width.is_finite() && t.cell_height.is_finite())
            || t.cell_width == 0.0
            || t.cell_height == 0.0
        {
            return Err(shape_error(format!(
                "cell size {} x {} must be finite and non-zero",
                t.cell_width, t.cell_height
            )));
        }
        if !(t.origin_x.is_finite() && t.origin_y.is_finite()) {
            return Err(shape_error("origin must be finite".to_string()));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[self.index(row, col)]
    }

    pub fn is_nodata_value(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.is_some_and(|nd| value == nd)
    }

    /// `None` when the cell is no-data.
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        let v = self.get(row, col);
        (!self.is_nodata_value(v)).then_some(v)
    }

    pub fn nodata_or_default(&self) -> f64 {
        self.nodata.unwrap_or(DEFAULT_NODATA)
    }

    pub fn extent(&self) -> Extent {
        let t = &self.transform;
        let x_end = t.origin_x + t.cell_width * self.width as f64;
        let y_end = t.origin_y + t.cell_height * self.height as f64;
        Extent {
            min_x: t.origin_x.min(x_end),
            max_x: t.origin_x.max(x_end),
            min_y: t.origin_y.min(y_end),
            max_y: t.origin_y.max(y_end),
        }
    }

    /// Sum of all valid cells.
    pub fn valid_sum(&self) -> f64 {
        let mut sum = crate::utils::summation::StableSum::default();
        for &v in &self.values {
            if !self.is_nodata_value(v) {
                sum.add(v);
            }
        }
        sum.value()
    }

    pub fn same_grid(&self, other: &Raster) -> bool {
        self.width == other.width && self.height == other.height && self.transform == other.transform
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthUnit {
    Metres,
    Feet,
}

impl DepthUnit {
    pub fn parse(unit: &str) -> Result<Self> {
        match unit.trim().to_ascii_lowercase().as_str() {
            "m" | "metre" | "metres" | "meter" | "meters" => Ok(DepthUnit::Metres),
            "ft" | "foot" | "feet" => Ok(DepthUnit::Feet),
            _ => Err(ImpactError::UnknownUnitError {
                unit: unit.to_string(),
            }),
        }
    }

    pub fn to_metres(self, value: f64) -> f64 {
        match self {
            DepthUnit::Metres => value,
            DepthUnit::Feet => value * FEET_TO_METRES,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DepthUnit::Metres => "metres",
            DepthUnit::Feet => "feet",
        }
    }
}

/// Inundation depths, always held in metres.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardRaster {
    raster: Raster,
    source_unit: DepthUnit,
}

impl HazardRaster {
    pub fn new(mut raster: Raster, unit: DepthUnit) -> Result<Self> {
        raster.check_shape()?;
        if unit != DepthUnit::Metres {
            let nodata = raster.nodata;
            for v in raster.values.iter_mut() {
                let is_nodata = v.is_nan() || nodata.is_some_and(|nd| *v == nd);
                if !is_nodata {
                    *v = unit.to_metres(*v);
                }
            }
        }
        Ok(Self {
            raster,
            source_unit: unit,
        })
    }

    /// Parses the unit label, e.g. `"feet"`.
    pub fn with_unit_label(raster: Raster, unit: &str) -> Result<Self> {
        Self::new(raster, DepthUnit::parse(unit)?)
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn source_unit(&self) -> DepthUnit {
        self.source_unit
    }

    pub fn depth(&self, row: usize, col: usize) -> Option<f64> {
        self.raster.value(row, col)
    }
}

/// Population count per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRaster {
    raster: Raster,
}

impl PopulationRaster {
    pub fn new(raster: Raster) -> Result<Self> {
        raster.check_shape()?;
        for row in 0..raster.height {
            for col in 0..raster.width {
                if let Some(value) = raster.value(row, col) {
                    if !value.is_finite() || value < 0.0 {
                        return Err(ImpactError::InvalidPopulationError { row, col, value });
                    }
                }
            }
        }
        Ok(Self { raster })
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn total(&self) -> f64 {
        self.raster.valid_sum()
    }
}

/// Strictly ascending positive depths in metres. The last one is the
/// evacuation threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSet {
    values: Vec<f64>,
}

impl ThresholdSet {
    pub const DEFAULT_EVACUATION_DEPTH: f64 = 0.7;

    pub fn new(values: Vec<f64>) -> Result<Self> {
        let invalid = |reason: &str| ImpactError::InvalidThresholdSetError {
            thresholds: values.clone(),
            reason: reason.to_string(),
        };

        if values.is_empty() {
            return Err(invalid("at least one threshold is required"));
        }
        if values.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return Err(invalid("thresholds must be finite and greater than zero"));
        }
        if values.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(invalid("thresholds must be strictly ascending"));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn lowest(&self) -> f64 {
        self.values[0]
    }

    pub fn evacuation_threshold(&self) -> f64 {
        self.values[self.values.len() - 1]
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            values: vec![Self::DEFAULT_EVACUATION_DEPTH],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub lower: f64,
    /// `None` for the open band above the evacuation threshold.
    pub upper: Option<f64>,
    pub population: f64,
}

impl BreakdownEntry {
    pub fn label(&self) -> String {
        match self.upper {
            Some(upper) => format!("{} - {} m", self.lower, upper),
            None => format!(">= {} m", self.lower),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoundingRule {
    #[default]
    Nearest,
    Up,
    Down,
}

impl RoundingRule {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            RoundingRule::Nearest => value.round(),
            RoundingRule::Up => value.ceil(),
            RoundingRule::Down => value.floor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeedQuantity {
    pub name: String,
    pub unit: String,
    pub frequency: String,
    pub per_person: f64,
    pub quantity: f64,
    pub rounded: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NeedsReport {
    pub population: f64,
    pub needs: Vec<NeedQuantity>,
}

impl NeedsReport {
    pub fn get(&self, name: &str) -> Option<&NeedQuantity> {
        self.needs.iter().find(|n| n.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImpactResult {
    pub affected: Raster,
    pub breakdown: Vec<BreakdownEntry>,
    pub below_lowest: f64,
    pub total_affected: f64,
    pub total_population: f64,
    pub evacuation_threshold: f64,
    pub needs: NeedsReport,
    pub no_valid_data: bool,
}

impl ImpactResult {
    /// Valid population below the evacuation threshold.
    pub fn not_affected(&self) -> f64 {
        self.total_population - self.total_affected
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostprocessorReport {
    pub name: String,
    pub rows: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedResult {
    /// Impact function the engine ran with.
    pub metadata: crate::domain::metadata::FunctionMetadata,
    pub result: ImpactResult,
    pub postprocessing: Vec<PostprocessorReport>,
}
