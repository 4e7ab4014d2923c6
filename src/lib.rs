pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::TextRasterCodec;
pub use app::pipelines::FilePipeline;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{
    engine::{compute, ImpactEngine},
    runner::AnalysisRunner,
};
pub use domain::metadata::{ImpactFunctionConfig, NeedDefinition, NeedsProfile};
pub use domain::model::{
    BreakdownEntry, DepthUnit, ExtendedResult, GeoTransform, HazardRaster, ImpactResult, NeedsReport,
    PopulationRaster, Raster, ThresholdSet,
};
pub use utils::error::{ImpactError, Result};
