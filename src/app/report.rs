use crate::core::rounding::round_population;
use crate::domain::metadata::FunctionMetadata;
use crate::domain::model::{ExtendedResult, NeedsReport, PostprocessorReport};
use crate::utils::error::{ImpactError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of `breakdown.csv`. The first row holds population below the
/// lowest threshold, the last one the open band that needs evacuation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub band: String,
    pub lower_m: Option<f64>,
    pub upper_m: Option<f64>,
    pub population: f64,
    pub population_rounded: f64,
}

#[derive(Debug, Clone, Serialize)]
struct NeedRow<'a> {
    name: &'a str,
    unit: &'a str,
    frequency: &'a str,
    per_person: f64,
    quantity: f64,
    rounded: f64,
}

#[derive(Debug, Clone, Serialize)]
struct PostprocessorRow<'a> {
    postprocessor: &'a str,
    label: &'a str,
    population: f64,
    population_rounded: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Provenance {
    pub tool: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub hazard_source: String,
    pub hazard_unit: String,
    pub population_source: String,
    pub needs_profile: String,
}

impl Provenance {
    pub fn now(hazard_source: &str, hazard_unit: &str, population_source: &str, needs_profile: &str) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            hazard_source: hazard_source.to_string(),
            hazard_unit: hazard_unit.to_string(),
            population_source: population_source.to_string(),
            needs_profile: needs_profile.to_string(),
        }
    }
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactSummary {
    pub analysis: String,
    pub function: FunctionMetadata,
    pub thresholds: Vec<f64>,
    pub evacuation_threshold: f64,
    pub total_population: f64,
    pub total_population_rounded: f64,
    pub total_affected: f64,
    pub total_affected_rounded: f64,
    pub not_affected: f64,
    pub no_valid_data: bool,
    pub breakdown: Vec<BreakdownRow>,
    pub needs: NeedsReport,
    pub postprocessing: Vec<PostprocessorReport>,
    pub provenance: Provenance,
}

impl ImpactSummary {
    pub fn new(analysis: &str, extended: &ExtendedResult, provenance: Provenance) -> Self {
        let result = &extended.result;
        Self {
            analysis: analysis.to_string(),
            function: extended.metadata.clone(),
            thresholds: threshold_values(extended),
            evacuation_threshold: result.evacuation_threshold,
            total_population: result.total_population,
            total_population_rounded: round_population(result.total_population),
            total_affected: result.total_affected,
            total_affected_rounded: round_population(result.total_affected),
            not_affected: result.not_affected(),
            no_valid_data: result.no_valid_data,
            breakdown: breakdown_rows(extended),
            needs: result.needs.clone(),
            postprocessing: extended.postprocessing.clone(),
            provenance,
        }
    }
}

fn threshold_values(extended: &ExtendedResult) -> Vec<f64> {
    extended.result.breakdown.iter().map(|entry| entry.lower).collect()
}

pub fn breakdown_rows(extended: &ExtendedResult) -> Vec<BreakdownRow> {
    let result = &extended.result;
    let lowest = result
        .breakdown
        .first()
        .map(|entry| entry.lower)
        .unwrap_or(result.evacuation_threshold);

    let mut rows = Vec::with_capacity(result.breakdown.len() + 1);
    rows.push(BreakdownRow {
        band: format!("< {} m", lowest),
        lower_m: None,
        upper_m: Some(lowest),
        population: result.below_lowest,
        population_rounded: round_population(result.below_lowest),
    });
    rows.extend(result.breakdown.iter().map(|entry| BreakdownRow {
        band: entry.label(),
        lower_m: Some(entry.lower),
        upper_m: entry.upper,
        population: entry.population,
        population_rounded: round_population(entry.population),
    }));
    rows
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| ImpactError::IoError(e.into_error()))
}

pub fn breakdown_csv(extended: &ExtendedResult) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in breakdown_rows(extended) {
        writer.serialize(row)?;
    }
    finish_csv(writer)
}

pub fn needs_csv(needs: &NeedsReport) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for need in &needs.needs {
        writer.serialize(NeedRow {
            name: &need.name,
            unit: &need.unit,
            frequency: &need.frequency,
            per_person: need.per_person,
            quantity: need.quantity,
            rounded: need.rounded,
        })?;
    }
    finish_csv(writer)
}

/// `None` when no postprocessor ran.
pub fn postprocessing_csv(reports: &[PostprocessorReport]) -> Result<Option<Vec<u8>>> {
    if reports.is_empty() {
        return Ok(None);
    }
    let mut writer = csv::Writer::from_writer(Vec::new());
    for report in reports {
        for (label, population) in &report.rows {
            writer.serialize(PostprocessorRow {
                postprocessor: &report.name,
                label,
                population: *population,
                population_rounded: round_population(*population),
            })?;
        }
    }
    finish_csv(writer).map(Some)
}
