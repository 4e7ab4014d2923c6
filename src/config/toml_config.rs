use crate::adapters::codec::SUPPORTED_FORMATS;
use crate::app::postprocessors;
use crate::core::needs::NeedsCalculator;
use crate::core::ConfigProvider;
use crate::domain::metadata::{NeedsProfile, PostprocessorSettings};
use crate::domain::model::{DepthUnit, ThresholdSet};
use crate::utils::error::{ImpactError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub analysis: AnalysisConfig,
    pub hazard: HazardConfig,
    pub exposure: ExposureConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub minimum_needs: NeedsProfile,
    #[serde(default)]
    pub postprocessors: PostprocessorSettings,
    pub output: OutputConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardConfig {
    pub path: String,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "metres".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    /// Depths in metres, ascending; the last is the evacuation threshold.
    pub values: Vec<f64>,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            values: vec![ThresholdSet::DEFAULT_EVACUATION_DEPTH],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    #[serde(default = "default_raster_format")]
    pub raster_format: String,
}

fn default_raster_format() -> String {
    "asc".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub worker_threads: Option<usize>,
    pub tile_rows: Option<usize>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            worker_threads: Some(1),
            tile_rows: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ImpactError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("analysis.name", &self.analysis.name)?;

        validation::validate_path("hazard.path", &self.hazard.path)?;
        validation::validate_file_extension("hazard.path", &self.hazard.path, SUPPORTED_FORMATS)?;
        DepthUnit::parse(&self.hazard.unit)?;

        validation::validate_path("exposure.path", &self.exposure.path)?;
        validation::validate_file_extension("exposure.path", &self.exposure.path, SUPPORTED_FORMATS)?;

        ThresholdSet::new(self.thresholds.values.clone())?;
        NeedsCalculator::validate(&self.minimum_needs)?;
        postprocessors::from_settings(&self.postprocessors)?;

        validation::validate_path("output.path", &self.output.path)?;
        if !SUPPORTED_FORMATS.contains(&self.output.raster_format.as_str()) {
            return Err(ImpactError::InvalidConfigValueError {
                field: "output.raster_format".to_string(),
                value: self.output.raster_format.clone(),
                reason: format!("Unsupported format. Valid formats: {}", SUPPORTED_FORMATS.join(", ")),
            });
        }

        if let Some(workers) = self.performance.worker_threads {
            validation::validate_positive_number("performance.worker_threads", workers, 1)?;
        }
        if let Some(rows) = self.performance.tile_rows {
            validation::validate_positive_number("performance.tile_rows", rows, 1)?;
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

/// 替換環境變數 (例如 ${DATA_DIR})；未設定的變數保留原樣
pub fn substitute_env_vars(content: &str) -> String {
    use regex::{Captures, Regex};
    use std::sync::OnceLock;

    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

    re.replace_all(content, |caps: &Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .into_owned()
}

/// Loads a standalone needs profile (`name` plus `[[needs]]` tables).
pub fn load_needs_profile<P: AsRef<Path>>(path: P) -> Result<NeedsProfile> {
    let content = std::fs::read_to_string(&path)?;
    let profile: NeedsProfile =
        toml::from_str(&substitute_env_vars(&content)).map_err(|e| ImpactError::ConfigValidationError {
            field: "minimum_needs".to_string(),
            message: format!("TOML parsing error: {}", e),
        })?;
    NeedsCalculator::validate(&profile)?;
    Ok(profile)
}

impl ConfigProvider for TomlConfig {
    fn analysis_name(&self) -> &str {
        &self.analysis.name
    }

    fn hazard_path(&self) -> &str {
        &self.hazard.path
    }

    fn hazard_unit(&self) -> &str {
        &self.hazard.unit
    }

    fn population_path(&self) -> &str {
        &self.exposure.path
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn thresholds(&self) -> &[f64] {
        &self.thresholds.values
    }

    fn needs_profile(&self) -> &NeedsProfile {
        &self.minimum_needs
    }

    fn postprocessors(&self) -> &PostprocessorSettings {
        &self.postprocessors
    }

    fn worker_threads(&self) -> usize {
        self.performance.worker_threads.unwrap_or(1)
    }

    fn tile_rows(&self) -> usize {
        self.performance
            .tile_rows
            .unwrap_or(crate::domain::metadata::ImpactFunctionConfig::DEFAULT_TILE_ROWS)
    }

    fn raster_format(&self) -> &str {
        &self.output.raster_format
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
