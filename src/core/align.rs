//! Area-weighted resampling of population counts onto the hazard grid.

use crate::domain::model::{HazardRaster, PopulationRaster, Raster};
use crate::utils::error::{ImpactError, Result};
use crate::utils::summation::StableSum;
use rayon::prelude::*;

/// Share of one source cell covered by a destination cell along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisWeight {
    index: usize,
    fraction: f64,
}

/// For every destination cell along an axis, the source cells it overlaps and
/// the fraction of each source cell's length inside it.
fn axis_weights(
    dst_origin: f64,
    dst_step: f64,
    dst_len: usize,
    src_origin: f64,
    src_step: f64,
    src_len: usize,
) -> Vec<Vec<AxisWeight>> {
    let src_span = src_step.abs();

    (0..dst_len)
        .map(|i| {
            let a = dst_origin + dst_step * i as f64;
            let b = dst_origin + dst_step * (i + 1) as f64;
            let (lo, hi) = (a.min(b), a.max(b));

            let ta = (lo - src_origin) / src_step;
            let tb = (hi - src_origin) / src_step;
            let (t_min, t_max) = (ta.min(tb), ta.max(tb));
            if t_max <= 0.0 || t_min >= src_len as f64 {
                return Vec::new();
            }

            let first = t_min.floor().max(0.0) as usize;
            let last = (t_max.ceil() as usize).min(src_len);

            (first..last)
                .filter_map(|j| {
                    let sa = src_origin + src_step * j as f64;
                    let sb = src_origin + src_step * (j + 1) as f64;
                    let overlap = hi.min(sa.max(sb)) - lo.max(sa.min(sb));
                    (overlap > 0.0).then(|| AxisWeight {
                        index: j,
                        fraction: overlap / src_span,
                    })
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GridAligner {
    parallel: bool,
}

impl GridAligner {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Resamples `population` onto `hazard`'s grid, conserving counts.
    ///
    /// Hazard no-data cells come out as no-data (NaN). So do cells that overlap
    /// no valid population cell, including cells outside the population extent.
    pub fn align(&self, hazard: &HazardRaster, population: &PopulationRaster) -> Result<Raster> {
        let h = hazard.raster();
        let p = population.raster();

        if let (Some(h_crs), Some(p_crs)) = (&h.crs, &p.crs) {
            if h_crs != p_crs {
                return Err(ImpactError::GridMismatchError {
                    reason: format!(
                        "hazard '{}' is in {} but population '{}' is in {}",
                        h.name, h_crs, p.name, p_crs
                    ),
                });
            }
        }

        let overlap = h.extent().intersection(&p.extent()).ok_or_else(|| {
            ImpactError::GridMismatchError {
                reason: format!(
                    "hazard '{}' {:?} and population '{}' {:?} do not overlap",
                    h.name,
                    h.extent(),
                    p.name,
                    p.extent()
                ),
            }
        })?;
        tracing::debug!(
            "Hazard/population overlap covers {:.1}% of the hazard extent",
            100.0 * overlap.area() / h.extent().area()
        );

        // NaN 當作無資料, 任何有效計數都不會與其相等
        let mut aligned = Raster::filled_like(h, format!("{} (aligned)", p.name), f64::NAN, None);

        if h.same_grid(p) {
            tracing::debug!("Population already on the hazard grid, copying values");
            for (i, out) in aligned.values.iter_mut().enumerate() {
                let (row, col) = (i / h.width, i % h.width);
                if h.value(row, col).is_some() {
                    if let Some(v) = p.value(row, col) {
                        *out = v;
                    }
                }
            }
            return Ok(aligned);
        }

        let t_h = &h.transform;
        let t_p = &p.transform;
        let col_weights = axis_weights(t_h.origin_x, t_h.cell_width, h.width, t_p.origin_x, t_p.cell_width, p.width);
        let row_weights = axis_weights(t_h.origin_y, t_h.cell_height, h.height, t_p.origin_y, t_p.cell_height, p.height);
        tracing::debug!(
            "Resampling {}x{} population cells onto {}x{} hazard cells",
            p.width,
            p.height,
            h.width,
            h.height
        );

        let fill_row = |row: usize, out: &mut [f64]| {
            for (col, cell) in out.iter_mut().enumerate() {
                if h.value(row, col).is_none() {
                    continue;
                }
                let mut sum = StableSum::default();
                let mut any_valid = false;
                for rw in &row_weights[row] {
                    for cw in &col_weights[col] {
                        if let Some(v) = p.value(rw.index, cw.index) {
                            sum.add(v * rw.fraction * cw.fraction);
                            any_valid = true;
                        }
                    }
                }
                if any_valid {
                    *cell = sum.value();
                }
            }
        };

        if self.parallel {
            aligned
                .values
                .par_chunks_mut(h.width)
                .enumerate()
                .for_each(|(row, out)| fill_row(row, out));
        } else {
            aligned
                .values
                .chunks_mut(h.width)
                .enumerate()
                .for_each(|(row, out)| fill_row(row, out));
        }

        Ok(aligned)
    }
}
