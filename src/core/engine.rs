use crate::core::aggregate::PopulationAggregator;
use crate::core::align::GridAligner;
use crate::core::needs::NeedsCalculator;
use crate::domain::metadata::{ImpactFunctionConfig, NeedsProfile};
use crate::domain::model::{ExtendedResult, HazardRaster, ImpactResult, PopulationRaster, ThresholdSet};
use crate::domain::ports::Postprocessor;
use crate::utils::error::{ImpactError, Result};

/// Runs validate → align → classify/aggregate → needs → assemble.
pub struct ImpactEngine {
    config: ImpactFunctionConfig,
    pool: Option<rayon::ThreadPool>,
}

impl ImpactEngine {
    pub fn new(config: ImpactFunctionConfig) -> Self {
        let pool = if config.worker_threads > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::warn!("Falling back to a single worker: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self { config, pool }
    }

    pub fn config(&self) -> &ImpactFunctionConfig {
        &self.config
    }

    fn validate(&self, hazard: &HazardRaster, population: &PopulationRaster) -> Result<()> {
        NeedsCalculator::validate(&self.config.needs_profile)?;

        let unit = hazard.source_unit();
        if !self.config.metadata.accepts_unit(unit) {
            return Err(ImpactError::UnknownUnitError {
                unit: unit.as_str().to_string(),
            });
        }

        hazard.raster().check_shape()?;
        population.raster().check_shape()?;
        Ok(())
    }

    pub fn compute(&self, hazard: &HazardRaster, population: &PopulationRaster) -> Result<ImpactResult> {
        match &self.pool {
            Some(pool) => pool.install(|| self.compute_inline(hazard, population, true)),
            None => self.compute_inline(hazard, population, false),
        }
    }

    fn compute_inline(
        &self,
        hazard: &HazardRaster,
        population: &PopulationRaster,
        parallel: bool,
    ) -> Result<ImpactResult> {
        self.validate(hazard, population)?;
        let thresholds = &self.config.thresholds;
        tracing::info!(
            "Computing evacuation impact with thresholds {:?} m (evacuation at {} m)",
            thresholds.values(),
            thresholds.evacuation_threshold()
        );

        let aligned = GridAligner::new(parallel).align(hazard, population)?;

        let aggregation = PopulationAggregator::new(thresholds, self.config.tile_rows, parallel)
            .aggregate(hazard, &aligned)?;

        let needs = NeedsCalculator::calculate(aggregation.total_affected, &self.config.needs_profile)?;

        let no_valid_data = aggregation.valid_cells == 0;
        if no_valid_data {
            tracing::warn!(
                "No valid cells in hazard '{}' and population '{}'",
                hazard.raster().name,
                population.raster().name
            );
        }
        tracing::info!(
            "{:.1} of {:.1} people affected across {} valid cells",
            aggregation.total_affected,
            aggregation.total_population,
            aggregation.valid_cells
        );

        Ok(ImpactResult {
            affected: aggregation.affected_raster,
            breakdown: aggregation.breakdown,
            below_lowest: aggregation.below_lowest,
            total_affected: aggregation.total_affected,
            total_population: aggregation.total_population,
            evacuation_threshold: thresholds.evacuation_threshold(),
            needs,
            no_valid_data,
        })
    }

    /// `compute`, then every postprocessor in order.
    pub fn compute_extended(
        &self,
        hazard: &HazardRaster,
        population: &PopulationRaster,
        postprocessors: &[Box<dyn Postprocessor>],
    ) -> Result<ExtendedResult> {
        let result = self.compute(hazard, population)?;
        let postprocessing = postprocessors
            .iter()
            .map(|p| {
                tracing::debug!("Running postprocessor {}", p.name());
                p.apply(&result)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ExtendedResult {
            metadata: self.config.metadata.clone(),
            result,
            postprocessing,
        })
    }
}

/// One-shot entry point with a single worker.
pub fn compute(
    hazard: &HazardRaster,
    population: &PopulationRaster,
    thresholds: ThresholdSet,
    needs_profile: NeedsProfile,
) -> Result<ImpactResult> {
    ImpactEngine::new(ImpactFunctionConfig::new(thresholds, needs_profile)).compute(hazard, population)
}
