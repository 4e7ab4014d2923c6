use crate::domain::metadata::{NeedsProfile, PostprocessorSettings};
use crate::domain::model::{ExtendedResult, HazardRaster, ImpactResult, PopulationRaster, PostprocessorReport, Raster};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn analysis_name(&self) -> &str;
    fn hazard_path(&self) -> &str;
    fn hazard_unit(&self) -> &str;
    fn population_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn thresholds(&self) -> &[f64];
    fn needs_profile(&self) -> &NeedsProfile;
    fn postprocessors(&self) -> &PostprocessorSettings;
    fn worker_threads(&self) -> usize;
    fn tile_rows(&self) -> usize;
    /// Format of the affected-population raster in the output bundle.
    fn raster_format(&self) -> &str;
}

/// Decodes raster files; `format` is the lower-case file extension.
pub trait RasterCodec: Send + Sync {
    fn decode(&self, name: &str, format: &str, bytes: &[u8]) -> Result<Raster>;
    fn encode(&self, raster: &Raster, format: &str) -> Result<Vec<u8>>;
}

/// Runs after the core result exists, e.g. gender or age breakdowns.
pub trait Postprocessor: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, result: &ImpactResult) -> Result<PostprocessorReport>;
}

/// Inputs decoded by the extract stage.
#[derive(Debug, Clone)]
pub struct ImpactInputs {
    pub hazard: HazardRaster,
    pub population: PopulationRaster,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ImpactInputs>;
    async fn transform(&self, inputs: ImpactInputs) -> Result<ExtendedResult>;
    async fn load(&self, result: ExtendedResult) -> Result<String>;
}
