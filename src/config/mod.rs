pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use crate::adapters::codec::SUPPORTED_FORMATS;
    use crate::core::needs::NeedsCalculator;
    use crate::core::ConfigProvider;
    use crate::domain::metadata::{
        AgeRatios, GenderRatios, ImpactFunctionConfig, NeedsProfile, PostprocessorSettings,
    };
    use crate::domain::model::{DepthUnit, ThresholdSet};
    use crate::utils::error::{ImpactError, Result};
    use crate::utils::validation::{self, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "tsunami-evac")]
    #[command(about = "Population needing evacuation from a tsunami inundation raster")]
    pub struct CliConfig {
        /// Inundation depth raster (.asc or .json)
        #[arg(long)]
        pub hazard: String,

        /// Population count raster (.asc or .json)
        #[arg(long)]
        pub population: String,

        #[arg(long, default_value = "metres")]
        pub hazard_unit: String,

        /// Depth thresholds in metres, ascending; the last one triggers evacuation
        #[arg(long, value_delimiter = ',', default_value = "0.7")]
        pub thresholds: Vec<f64>,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        #[arg(long, default_value = "asc")]
        pub raster_format: String,

        /// TOML minimum-needs profile; BNPB defaults when omitted
        #[arg(long)]
        pub needs_file: Option<String>,

        #[arg(long, default_value = "1")]
        pub workers: usize,

        #[arg(long, default_value_t = ImpactFunctionConfig::DEFAULT_TILE_ROWS)]
        pub tile_rows: usize,

        /// Report a female/male split of the affected population
        #[arg(long)]
        pub gender: bool,

        /// Report a youth/adult/elderly split of the affected population
        #[arg(long)]
        pub age: bool,

        #[arg(long, default_value = "analysis")]
        pub name: String,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU and memory after each stage")]
        pub monitor: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub json_logs: bool,

        #[arg(skip)]
        pub needs_profile: NeedsProfile,

        #[arg(skip)]
        pub postprocessor_settings: PostprocessorSettings,
    }

    impl CliConfig {
        /// Loads the needs file and turns postprocessor flags into settings.
        pub fn resolve(mut self) -> Result<Self> {
            self.needs_profile = match &self.needs_file {
                Some(path) => crate::config::toml_config::load_needs_profile(path)?,
                None => NeedsProfile::bnpb_default(),
            };
            self.postprocessor_settings = PostprocessorSettings {
                gender: self.gender.then(GenderRatios::default),
                age: self.age.then(AgeRatios::default),
            };
            Ok(self)
        }
    }

    impl ConfigProvider for CliConfig {
        fn analysis_name(&self) -> &str {
            &self.name
        }

        fn hazard_path(&self) -> &str {
            &self.hazard
        }

        fn hazard_unit(&self) -> &str {
            &self.hazard_unit
        }

        fn population_path(&self) -> &str {
            &self.population
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn thresholds(&self) -> &[f64] {
            &self.thresholds
        }

        fn needs_profile(&self) -> &NeedsProfile {
            &self.needs_profile
        }

        fn postprocessors(&self) -> &PostprocessorSettings {
            &self.postprocessor_settings
        }

        fn worker_threads(&self) -> usize {
            self.workers
        }

        fn tile_rows(&self) -> usize {
            self.tile_rows
        }

        fn raster_format(&self) -> &str {
            &self.raster_format
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_path("hazard", &self.hazard)?;
            validation::validate_file_extension("hazard", &self.hazard, SUPPORTED_FORMATS)?;
            validation::validate_path("population", &self.population)?;
            validation::validate_file_extension("population", &self.population, SUPPORTED_FORMATS)?;
            DepthUnit::parse(&self.hazard_unit)?;
            ThresholdSet::new(self.thresholds.clone())?;
            NeedsCalculator::validate(&self.needs_profile)?;
            validation::validate_path("output_path", &self.output_path)?;
            if !SUPPORTED_FORMATS.contains(&self.raster_format.as_str()) {
                return Err(ImpactError::InvalidConfigValueError {
                    field: "raster_format".to_string(),
                    value: self.raster_format.clone(),
                    reason: format!("Valid formats: {}", SUPPORTED_FORMATS.join(", ")),
                });
            }
            validation::validate_positive_number("workers", self.workers, 1)?;
            validation::validate_positive_number("tile_rows", self.tile_rows, 1)?;
            Ok(())
        }
    }

}
