//! Single pass over the aligned grid producing the affected raster and the
//! breakdown sums. Tiles of rows are summed independently and merged in tile
//! order, so the result does not depend on scheduling.

use crate::core::classify::{Classification, ThresholdClassifier};
use crate::domain::model::{BreakdownEntry, HazardRaster, Raster, ThresholdSet, DEFAULT_NODATA};
use crate::utils::error::{ImpactError, Result};
use crate::utils::summation::StableSum;
use rayon::prelude::*;

#[derive(Debug, Clone, Default)]
struct TileSums {
    below: StableSum,
    bands: Vec<StableSum>,
    affected: StableSum,
    valid_cells: usize,
}

impl TileSums {
    fn with_bands(bands: usize) -> Self {
        Self {
            bands: vec![StableSum::default(); bands],
            ..Self::default()
        }
    }

    fn merge(&mut self, other: &TileSums) {
        self.below.merge(&other.below);
        for (mine, theirs) in self.bands.iter_mut().zip(&other.bands) {
            mine.merge(theirs);
        }
        self.affected.merge(&other.affected);
        self.valid_cells += other.valid_cells;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub affected_raster: Raster,
    /// One entry per band between consecutive thresholds, then the open
    /// band at and above the evacuation threshold.
    pub breakdown: Vec<BreakdownEntry>,
    pub below_lowest: f64,
    pub total_affected: f64,
    pub total_population: f64,
    pub valid_cells: usize,
}

/// No-data marker for the affected raster. Counts are never negative, so a
/// negative hazard sentinel is kept and anything else falls back to
/// `DEFAULT_NODATA`.
fn affected_nodata(hazard: &Raster) -> f64 {
    match hazard.nodata {
        Some(nd) if nd < 0.0 => nd,
        _ => DEFAULT_NODATA,
    }
}

pub struct PopulationAggregator<'a> {
    thresholds: &'a ThresholdSet,
    tile_rows: usize,
    parallel: bool,
}

impl<'a> PopulationAggregator<'a> {
    pub fn new(thresholds: &'a ThresholdSet, tile_rows: usize, parallel: bool) -> Self {
        Self {
            thresholds,
            tile_rows: tile_rows.max(1),
            parallel,
        }
    }

    pub fn aggregate(&self, hazard: &HazardRaster, aligned: &Raster) -> Result<Aggregation> {
        let h = hazard.raster();
        if !h.same_grid(aligned) {
            return Err(ImpactError::GridMismatchError {
                reason: format!(
                    "aligned population '{}' is not on the hazard grid '{}'",
                    aligned.name, h.name
                ),
            });
        }

        let classifier = ThresholdClassifier::new(self.thresholds);
        let bands = classifier.intermediate_bands();
        let nodata = affected_nodata(h);
        let mut affected_raster = Raster::filled_like(h, "affected_population", nodata, Some(nodata));

        // 每個 tile 至多涵蓋整張格網
        let tile_len = self.tile_rows.min(h.height).saturating_mul(h.width);
        let walk = |(tile, out): (usize, &mut [f64])| -> TileSums {
            let mut sums = TileSums::with_bands(bands);
            let first = tile * tile_len;
            for (offset, cell) in out.iter_mut().enumerate() {
                let (row, col) = ((first + offset) / h.width, (first + offset) % h.width);
                let Some(people) = aligned.value(row, col) else {
                    continue;
                };
                match classifier.classify(hazard.depth(row, col)) {
                    Classification::Unclassified => continue,
                    Classification::BelowThresholds => {
                        sums.below.add(people);
                        *cell = 0.0;
                    }
                    Classification::Band(i) => {
                        sums.bands[i].add(people);
                        *cell = 0.0;
                    }
                    Classification::Affected => {
                        sums.affected.add(people);
                        *cell = people;
                    }
                }
                sums.valid_cells += 1;
            }
            sums
        };

        let tiles: Vec<TileSums> = if self.parallel {
            affected_raster
                .values
                .par_chunks_mut(tile_len)
                .enumerate()
                .map(walk)
                .collect()
        } else {
            affected_raster
                .values
                .chunks_mut(tile_len)
                .enumerate()
                .map(walk)
                .collect()
        };
        tracing::debug!("Aggregated {} tiles of {} rows", tiles.len(), self.tile_rows);

        let mut totals = TileSums::with_bands(bands);
        for tile in &tiles {
            totals.merge(tile);
        }

        let values = self.thresholds.values();
        let mut breakdown: Vec<BreakdownEntry> = totals
            .bands
            .iter()
            .enumerate()
            .map(|(i, sum)| BreakdownEntry {
                lower: values[i],
                upper: Some(values[i + 1]),
                population: sum.value(),
            })
            .collect();
        breakdown.push(BreakdownEntry {
            lower: self.thresholds.evacuation_threshold(),
            upper: None,
            population: totals.affected.value(),
        });

        let mut total = totals.below;
        for band in &totals.bands {
            total.merge(band);
        }
        total.merge(&totals.affected);

        Ok(Aggregation {
            affected_raster,
            breakdown,
            below_lowest: totals.below.value(),
            total_affected: totals.affected.value(),
            total_population: total.value(),
            valid_cells: totals.valid_cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DepthUnit, GeoTransform};

    fn grid(values: Vec<f64>) -> Raster {
        Raster::new("grid", 2, 2, GeoTransform::north_up(0.0, 2.0, 1.0), Some(-9999.0), values).unwrap()
    }

    #[test]
    fn test_breakdown_with_two_thresholds() {
        let hazard = HazardRaster::new(grid(vec![0.5, 0.8, 1.0, 0.0]), DepthUnit::Metres).unwrap();
        let population = grid(vec![10.0, 20.0, 30.0, 40.0]);
        let thresholds = ThresholdSet::new(vec![0.3, 0.7]).unwrap();

        let result = PopulationAggregator::new(&thresholds, 1, false)
            .aggregate(&hazard, &population)
            .unwrap();

        assert_eq!(result.below_lowest, 40.0);
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.breakdown[0].lower, 0.3);
        assert_eq!(result.breakdown[0].upper, Some(0.7));
        assert_eq!(result.breakdown[0].population, 10.0);
        assert_eq!(result.breakdown[1].upper, None);
        assert_eq!(result.breakdown[1].population, 50.0);
        assert_eq!(result.total_affected, 50.0);
        assert_eq!(result.total_population, 100.0);
        assert_eq!(result.affected_raster.values, vec![0.0, 20.0, 30.0, 0.0]);
    }

    #[test]
    fn test_nodata_cells_excluded_and_propagated() {
        let hazard = HazardRaster::new(grid(vec![-9999.0, 0.8, 1.0, 0.0]), DepthUnit::Metres).unwrap();
        let population = grid(vec![10.0, -9999.0, 30.0, 40.0]);
        let thresholds = ThresholdSet::default();

        let result = PopulationAggregator::new(&thresholds, 1, true)
            .aggregate(&hazard, &population)
            .unwrap();

        assert_eq!(result.valid_cells, 2);
        assert_eq!(result.total_population, 70.0);
        assert_eq!(result.total_affected, 30.0);
        assert_eq!(result.affected_raster.value(0, 0), None);
        assert_eq!(result.affected_raster.value(0, 1), None);
        assert_eq!(result.affected_raster.value(1, 0), Some(30.0));
        assert_eq!(result.affected_raster.value(1, 1), Some(0.0));
    }

    #[test]
    fn test_tile_size_does_not_change_sums() {
        let depths: Vec<f64> = (0..4).map(|i| i as f64 * 0.4).collect();
        let hazard = HazardRaster::new(grid(depths), DepthUnit::Metres).unwrap();
        let population = grid(vec![1.5, 2.25, 3.125, 4.0625]);
        let thresholds = ThresholdSet::new(vec![0.5, 1.0]).unwrap();

        let one = PopulationAggregator::new(&thresholds, 1, true).aggregate(&hazard, &population).unwrap();
        let many = PopulationAggregator::new(&thresholds, 64, false).aggregate(&hazard, &population).unwrap();

        assert_eq!(one.breakdown, many.breakdown);
        assert_eq!(one.affected_raster, many.affected_raster);
    }

    #[test]
    fn test_zero_sentinel_does_not_hide_unaffected_cells() {
        let row = |nodata: Option<f64>, values: Vec<f64>| {
            Raster::new("row", 2, 1, GeoTransform::north_up(0.0, 1.0, 1.0), nodata, values).unwrap()
        };
        let hazard = HazardRaster::new(row(Some(0.0), vec![0.1, 1.0]), DepthUnit::Metres).unwrap();
        let population = row(Some(0.0), vec![5.0, 7.0]);
        let thresholds = ThresholdSet::default();

        let result = PopulationAggregator::new(&thresholds, 1, false)
            .aggregate(&hazard, &population)
            .unwrap();

        assert_eq!(result.affected_raster.nodata, Some(DEFAULT_NODATA));
        assert_eq!(result.affected_raster.value(0, 0), Some(0.0));
        assert_eq!(result.affected_raster.value(0, 1), Some(7.0));
        assert_eq!(result.total_population, 12.0);
    }

    #[test]
    fn test_negative_hazard_sentinel_is_reused() {
        let hazard = HazardRaster::new(
            Raster::new("depth", 2, 1, GeoTransform::north_up(0.0, 1.0, 1.0), Some(-1.0), vec![-1.0, 1.0]).unwrap(),
            DepthUnit::Metres,
        )
        .unwrap();
        let population = Raster::new("people", 2, 1, GeoTransform::north_up(0.0, 1.0, 1.0), None, vec![3.0, 4.0]).unwrap();
        let thresholds = ThresholdSet::default();

        let result = PopulationAggregator::new(&thresholds, 1, false)
            .aggregate(&hazard, &population)
            .unwrap();

        assert_eq!(result.affected_raster.nodata, Some(-1.0));
        assert_eq!(result.affected_raster.values, vec![-1.0, 4.0]);
    }

    #[test]
    fn test_oversized_tile_rows_cover_whole_grid() {
        let hazard = HazardRaster::new(grid(vec![0.5, 0.8, 1.0, 0.0]), DepthUnit::Metres).unwrap();
        let population = grid(vec![10.0, 20.0, 30.0, 40.0]);
        let thresholds = ThresholdSet::default();

        for parallel in [false, true] {
            let result = PopulationAggregator::new(&thresholds, usize::MAX, parallel)
                .aggregate(&hazard, &population)
                .unwrap();
            assert_eq!(result.total_affected, 50.0);
            assert_eq!(result.total_population, 100.0);
        }
    }

    #[test]
    fn test_grid_mismatch_rejected() {
        let hazard = HazardRaster::new(grid(vec![0.0; 4]), DepthUnit::Metres).unwrap();
        let other = Raster::new("other", 1, 4, GeoTransform::north_up(0.0, 4.0, 1.0), None, vec![0.0; 4]).unwrap();
        let thresholds = ThresholdSet::default();

        assert!(PopulationAggregator::new(&thresholds, 8, false)
            .aggregate(&hazard, &other)
            .is_err());
    }
}
