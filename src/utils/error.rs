use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImpactError {
    #[error("Grid mismatch: {reason}")]
    GridMismatchError { reason: String },

    #[error("Invalid threshold set {thresholds:?}: {reason}")]
    InvalidThresholdSetError { thresholds: Vec<f64>, reason: String },

    #[error("Invalid needs profile entry '{category}': {reason}")]
    InvalidNeedsProfileError { category: String, reason: String },

    #[error("Raster '{raster}' has an invalid shape: {reason}")]
    RasterShapeError { raster: String, reason: String },

    #[error("Unrecognised hazard unit '{unit}' (expected metres or feet)")]
    UnknownUnitError { unit: String },

    #[error("Invalid population value {value} at cell ({row}, {col})")]
    InvalidPopulationError { row: usize, col: usize, value: f64 },

    #[error("Raster format error in '{source_name}' line {line}: {message}")]
    RasterFormatError {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Postprocessor '{name}' failed: {message}")]
    PostprocessorError { name: String, message: String },

    #[error("Worker task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ImpactError::GridMismatchError { .. }
            | ImpactError::RasterShapeError { .. }
            | ImpactError::InvalidPopulationError { .. }
            | ImpactError::RasterFormatError { .. } => ErrorCategory::Input,
            ImpactError::InvalidThresholdSetError { .. }
            | ImpactError::InvalidNeedsProfileError { .. }
            | ImpactError::UnknownUnitError { .. }
            | ImpactError::ConfigValidationError { .. }
            | ImpactError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            ImpactError::PostprocessorError { .. }
            | ImpactError::CsvError(_)
            | ImpactError::SerializationError(_) => ErrorCategory::Processing,
            ImpactError::ZipError(_) | ImpactError::IoError(_) | ImpactError::TaskError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Processing => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 依錯誤種類給出修正建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ImpactError::GridMismatchError { .. } => {
                "Check that the hazard and population rasters cover the same area and use the same CRS"
            }
            ImpactError::InvalidThresholdSetError { .. } => {
                "Provide one or more positive depths in metres, sorted ascending, e.g. 0.3,0.7"
            }
            ImpactError::InvalidNeedsProfileError { .. } => {
                "Every minimum need must have a name and a finite, non-negative per-person amount"
            }
            ImpactError::RasterShapeError { .. } | ImpactError::RasterFormatError { .. } => {
                "Re-export the raster; its header does not match its data"
            }
            ImpactError::UnknownUnitError { .. } => "Use 'metres' or 'feet' as the hazard unit",
            ImpactError::InvalidPopulationError { .. } => {
                "Population rasters must hold non-negative counts per cell (not densities)"
            }
            ImpactError::ConfigValidationError { .. }
            | ImpactError::InvalidConfigValueError { .. } => "Fix the configuration file or command line flags",
            ImpactError::PostprocessorError { .. } => {
                "Check the postprocessor ratios or disable the postprocessor"
            }
            ImpactError::CsvError(_) | ImpactError::SerializationError(_) => {
                "Re-run with --verbose to see which output failed to serialise"
            }
            ImpactError::ZipError(_) | ImpactError::IoError(_) => {
                "Check file paths, permissions and free disk space"
            }
            ImpactError::TaskError(_) => "Re-run the analysis; the worker thread stopped unexpectedly",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Input data problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 程式結束碼，與嚴重程度對應
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImpactError>;
