use crate::domain::metadata::{AgeRatios, GenderRatios, PostprocessorSettings};
use crate::domain::model::{ImpactResult, PostprocessorReport};
use crate::domain::ports::Postprocessor;
use crate::utils::error::{ImpactError, Result};
use crate::utils::validation::validate_range;

const RATIO_TOLERANCE: f64 = 1e-6;

/// Splits the affected total into female and male counts.
#[derive(Debug, Clone)]
pub struct GenderPostprocessor {
    ratios: GenderRatios,
}

impl GenderPostprocessor {
    pub fn new(ratios: GenderRatios) -> Result<Self> {
        validate_range("postprocessors.gender.female", ratios.female, 0.0, 1.0).map_err(|e| {
            ImpactError::PostprocessorError {
                name: "Gender".to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self { ratios })
    }
}

impl Postprocessor for GenderPostprocessor {
    fn name(&self) -> &str {
        "Gender"
    }

    fn apply(&self, result: &ImpactResult) -> Result<PostprocessorReport> {
        let female = result.total_affected * self.ratios.female;
        Ok(PostprocessorReport {
            name: self.name().to_string(),
            rows: vec![
                ("Female population".to_string(), female),
                ("Male population".to_string(), result.total_affected - female),
            ],
        })
    }
}

/// Splits the affected total into youth, adult and elderly counts.
#[derive(Debug, Clone)]
pub struct AgePostprocessor {
    ratios: AgeRatios,
}

impl AgePostprocessor {
    pub fn new(ratios: AgeRatios) -> Result<Self> {
        let invalid = |message: String| ImpactError::PostprocessorError {
            name: "Age".to_string(),
            message,
        };
        for (field, value) in [
            ("youth", ratios.youth),
            ("adult", ratios.adult),
            ("elderly", ratios.elderly),
        ] {
            validate_range(&format!("postprocessors.age.{}", field), value, 0.0, 1.0)
                .map_err(|e| invalid(e.to_string()))?;
        }

        let total = ratios.youth + ratios.adult + ratios.elderly;
        if (total - 1.0).abs() > RATIO_TOLERANCE {
            return Err(invalid(format!("age ratios must sum to 1, got {}", total)));
        }
        Ok(Self { ratios })
    }
}

impl Postprocessor for AgePostprocessor {
    fn name(&self) -> &str {
        "Age"
    }

    fn apply(&self, result: &ImpactResult) -> Result<PostprocessorReport> {
        let total = result.total_affected;
        Ok(PostprocessorReport {
            name: self.name().to_string(),
            rows: vec![
                ("Youth population".to_string(), total * self.ratios.youth),
                ("Adult population".to_string(), total * self.ratios.adult),
                ("Elderly population".to_string(), total * self.ratios.elderly),
            ],
        })
    }
}

/// Builds the enabled postprocessors in a fixed order: gender, then age.
pub fn from_settings(settings: &PostprocessorSettings) -> Result<Vec<Box<dyn Postprocessor>>> {
    let mut postprocessors: Vec<Box<dyn Postprocessor>> = Vec::new();
    if let Some(ratios) = settings.gender {
        postprocessors.push(Box::new(GenderPostprocessor::new(ratios)?));
    }
    if let Some(ratios) = settings.age {
        postprocessors.push(Box::new(AgePostprocessor::new(ratios)?));
    }
    Ok(postprocessors)
}
