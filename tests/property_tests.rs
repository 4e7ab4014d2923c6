use proptest::prelude::*;
use tsunami_evac::core::align::GridAligner;
use tsunami_evac::{
    compute, DepthUnit, GeoTransform, HazardRaster, ImpactError, NeedsProfile, PopulationRaster, Raster, ThresholdSet,
};

const NODATA: f64 = -9999.0;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn hazard_grid(width: usize, height: usize, cell: f64, depths: Vec<f64>) -> HazardRaster {
    let transform = GeoTransform::north_up(0.0, height as f64 * cell, cell);
    HazardRaster::new(
        Raster::new("depth", width, height, transform, Some(NODATA), depths).unwrap(),
        DepthUnit::Metres,
    )
    .unwrap()
}

fn population_grid(width: usize, height: usize, cell: f64, counts: Vec<f64>) -> PopulationRaster {
    let transform = GeoTransform::north_up(0.0, height as f64 * cell, cell);
    PopulationRaster::new(Raster::new("people", width, height, transform, Some(NODATA), counts).unwrap())
        .unwrap()
}

/// Hazard and population covering the same extent, the population grid
/// `factor` times coarser (or finer when `coarse` is false).
fn resampled_inputs() -> impl Strategy<Value = (HazardRaster, PopulationRaster)> {
    (1usize..5, 1usize..5, 1usize..4, any::<bool>()).prop_flat_map(|(w, h, factor, coarse)| {
        let (hw, hh, hc, pw, ph, pc) = if coarse {
            (w * factor, h * factor, 1.0, w, h, factor as f64)
        } else {
            (w, h, factor as f64, w * factor, h * factor, 1.0)
        };
        (
            prop::collection::vec(0.0f64..3.0, hw * hh),
            prop::collection::vec(0.0f64..1000.0, pw * ph),
        )
            .prop_map(move |(depths, counts)| {
                (
                    hazard_grid(hw, hh, hc, depths),
                    population_grid(pw, ph, pc, counts),
                )
            })
    })
}

/// Same-grid inputs where roughly a quarter of hazard cells are no-data.
fn masked_inputs() -> impl Strategy<Value = (HazardRaster, PopulationRaster)> {
    (1usize..8, 1usize..8).prop_flat_map(|(w, h)| {
        (
            prop::collection::vec(prop_oneof![3 => 0.0f64..3.0, 1 => Just(NODATA)], w * h),
            prop::collection::vec(0.0f64..500.0, w * h),
        )
            .prop_map(move |(depths, counts)| (hazard_grid(w, h, 1.0, depths), population_grid(w, h, 1.0, counts)))
    })
}

/// Hazard and population grids with unrelated origins and cell sizes. The
/// population grid may only partly cover the hazard and holds some no-data.
fn offset_inputs() -> impl Strategy<Value = (HazardRaster, PopulationRaster)> {
    (
        (1usize..6, 1usize..6, -5.0f64..5.0, -5.0f64..5.0, 0.5f64..3.0),
        (1usize..6, 1usize..6, -5.0f64..5.0, -5.0f64..5.0, 0.3f64..4.0),
    )
        .prop_flat_map(|((hw, hh, hx, hy, hc), (pw, ph, px, py, pc))| {
            (
                prop::collection::vec(0.0f64..3.0, hw * hh),
                prop::collection::vec(prop_oneof![4 => 0.0f64..1000.0, 1 => Just(NODATA)], pw * ph),
            )
                .prop_map(move |(depths, counts)| {
                    let hazard = HazardRaster::new(
                        Raster::new("depth", hw, hh, GeoTransform::north_up(hx, hy, hc), Some(NODATA), depths)
                            .unwrap(),
                        DepthUnit::Metres,
                    )
                    .unwrap();
                    let population = PopulationRaster::new(
                        Raster::new("people", pw, ph, GeoTransform::north_up(px, py, pc), Some(NODATA), counts)
                            .unwrap(),
                    )
                    .unwrap();
                    (hazard, population)
                })
        })
}

/// Valid population weighted by the share of each cell inside the hazard extent.
fn population_inside_hazard(hazard: &HazardRaster, population: &PopulationRaster) -> f64 {
    let h = hazard.raster().extent();
    let p = population.raster();
    let t = &p.transform;
    let size = t.cell_width;
    let span = |lo: f64, hi: f64, min: f64, max: f64| (hi.min(max) - lo.max(min)).max(0.0);

    let mut total = 0.0;
    for row in 0..p.height {
        for col in 0..p.width {
            if let Some(v) = p.value(row, col) {
                let x0 = t.origin_x + size * col as f64;
                let y1 = t.origin_y - size * row as f64;
                let fx = span(x0, x0 + size, h.min_x, h.max_x) / size;
                let fy = span(y1 - size, y1, h.min_y, h.max_y) / size;
                total += v * fx * fy;
            }
        }
    }
    total
}

fn threshold_sets() -> impl Strategy<Value = ThresholdSet> {
    prop::collection::btree_set(1u32..30, 1..4).prop_map(|steps| {
        ThresholdSet::new(steps.into_iter().map(|s| s as f64 / 10.0).collect()).unwrap()
    })
}

proptest! {
    #[test]
    fn prop_alignment_conserves_population((hazard, population) in resampled_inputs()) {
        let aligned = GridAligner::new(false).align(&hazard, &population).unwrap();
        prop_assert!(close(aligned.valid_sum(), population.total()));
    }

    #[test]
    fn prop_alignment_conserves_population_over_overlap((hazard, population) in offset_inputs()) {
        let expected = population_inside_hazard(&hazard, &population);
        match GridAligner::new(false).align(&hazard, &population) {
            Ok(aligned) => {
                prop_assert!(
                    (aligned.valid_sum() - expected).abs() <= 1e-6 * expected.max(1.0),
                    "aligned {} vs expected {}",
                    aligned.valid_sum(),
                    expected
                );
            }
            Err(e) => {
                prop_assert!(matches!(e, ImpactError::GridMismatchError { .. }), "unexpected error: {:?}", e);
                prop_assert!(expected == 0.0);
            }
        }
    }

    #[test]
    fn prop_breakdown_is_complete(
        (hazard, population) in resampled_inputs(),
        thresholds in threshold_sets(),
    ) {
        let result = compute(&hazard, &population, thresholds, NeedsProfile::bnpb_default()).unwrap();
        let bands: f64 = result.breakdown.iter().map(|b| b.population).sum();

        prop_assert!(close(bands + result.below_lowest, result.total_population));
        prop_assert!(close(result.total_population, population.total()));
        prop_assert_eq!(result.breakdown.last().unwrap().population, result.total_affected);
    }

    #[test]
    fn prop_affected_total_decreases_with_threshold(
        (hazard, population) in resampled_inputs(),
        low in 1u32..15,
        gap in 1u32..15,
    ) {
        let lower = ThresholdSet::new(vec![low as f64 / 10.0]).unwrap();
        let higher = ThresholdSet::new(vec![(low + gap) as f64 / 10.0]).unwrap();

        let a = compute(&hazard, &population, lower, NeedsProfile::empty("none")).unwrap();
        let b = compute(&hazard, &population, higher, NeedsProfile::empty("none")).unwrap();

        prop_assert!(a.total_affected >= b.total_affected || close(a.total_affected, b.total_affected));
    }

    #[test]
    fn prop_repeated_runs_are_bit_identical(
        (hazard, population) in resampled_inputs(),
        thresholds in threshold_sets(),
    ) {
        let first = compute(&hazard, &population, thresholds.clone(), NeedsProfile::bnpb_default()).unwrap();
        let second = compute(&hazard, &population, thresholds, NeedsProfile::bnpb_default()).unwrap();

        let bits = |values: &[f64]| values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        prop_assert_eq!(bits(&first.affected.values), bits(&second.affected.values));
        prop_assert_eq!(
            first.breakdown.iter().map(|b| b.population.to_bits()).collect::<Vec<_>>(),
            second.breakdown.iter().map(|b| b.population.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn prop_hazard_nodata_propagates((hazard, population) in masked_inputs()) {
        let result = compute(&hazard, &population, ThresholdSet::default(), NeedsProfile::bnpb_default()).unwrap();
        let raster = hazard.raster();

        for row in 0..raster.height {
            for col in 0..raster.width {
                match hazard.depth(row, col) {
                    None => {
                        prop_assert_eq!(result.affected.value(row, col), None);
                    }
                    Some(depth) if depth >= 0.7 => {
                        prop_assert_eq!(result.affected.value(row, col), population.raster().value(row, col));
                    }
                    Some(_) => {
                        prop_assert_eq!(result.affected.value(row, col), Some(0.0));
                    }
                }
            }
        }
        prop_assert_eq!(result.no_valid_data, hazard.raster().values.iter().all(|v| *v == NODATA));
    }
}
