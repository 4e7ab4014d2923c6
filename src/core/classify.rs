use crate::domain::model::ThresholdSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No-data depth; excluded from every sum.
    Unclassified,
    BelowThresholds,
    /// `thresholds[i] <= depth < thresholds[i + 1]`.
    Band(usize),
    /// `depth >= evacuation threshold`.
    Affected,
}

#[derive(Debug, Clone, Copy)]
pub struct ThresholdClassifier<'a> {
    thresholds: &'a ThresholdSet,
}

impl<'a> ThresholdClassifier<'a> {
    pub fn new(thresholds: &'a ThresholdSet) -> Self {
        Self { thresholds }
    }

    /// Bands between consecutive thresholds, excluding the affected band.
    pub fn intermediate_bands(&self) -> usize {
        self.thresholds.len() - 1
    }

    /// Lower bounds are inclusive: a depth equal to a threshold belongs to the
    /// band starting at it.
    pub fn classify(&self, depth: Option<f64>) -> Classification {
        let depth = match depth {
            Some(d) if !d.is_nan() => d,
            _ => return Classification::Unclassified,
        };

        let values = self.thresholds.values();
        match values.partition_point(|t| *t <= depth) {
            0 => Classification::BelowThresholds,
            n if n == values.len() => Classification::Affected,
            n => Classification::Band(n - 1),
        }
    }
}
