use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::StageMonitor;

/// Drives a pipeline stage by stage: extract → transform → load.
pub struct AnalysisRunner<P: Pipeline> {
    pipeline: P,
    monitor: StageMonitor,
}

impl<P: Pipeline> AnalysisRunner<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: StageMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting impact analysis...");

        // Extract
        tracing::info!("Loading hazard and population rasters...");
        let inputs = self.pipeline.extract().await?;
        tracing::info!(
            "Loaded hazard {}x{} and population {}x{}",
            inputs.hazard.raster().width,
            inputs.hazard.raster().height,
            inputs.population.raster().width,
            inputs.population.raster().height
        );
        self.monitor.log_stage("Extract");

        // Transform
        tracing::info!("Computing affected population...");
        let result = self.pipeline.transform(inputs).await?;
        tracing::info!(
            "{} breakdown bands, {} postprocessor reports",
            result.result.breakdown.len(),
            result.postprocessing.len()
        );
        self.monitor.log_stage("Transform");

        // Load
        tracing::info!("Writing impact outputs...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stage("Load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
