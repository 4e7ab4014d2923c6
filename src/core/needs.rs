use crate::domain::metadata::NeedsProfile;
use crate::domain::model::{NeedQuantity, NeedsReport};
use crate::utils::error::{ImpactError, Result};

pub struct NeedsCalculator;

impl NeedsCalculator {
    pub fn validate(profile: &NeedsProfile) -> Result<()> {
        for need in &profile.needs {
            let invalid = |reason: &str| ImpactError::InvalidNeedsProfileError {
                category: need.name.clone(),
                reason: reason.to_string(),
            };
            if need.name.trim().is_empty() {
                return Err(invalid("category name cannot be empty"));
            }
            if !need.per_person.is_finite() {
                return Err(invalid("per-person amount must be finite"));
            }
            if need.per_person < 0.0 {
                return Err(invalid("per-person amount cannot be negative"));
            }
        }
        Ok(())
    }

    /// `population × per_person` for each category, in profile order.
    pub fn calculate(population: f64, profile: &NeedsProfile) -> Result<NeedsReport> {
        Self::validate(profile)?;

        let needs = profile
            .needs
            .iter()
            .map(|need| {
                let quantity = population * need.per_person;
                NeedQuantity {
                    name: need.name.clone(),
                    unit: need.unit.clone(),
                    frequency: need.frequency.clone(),
                    per_person: need.per_person,
                    quantity,
                    rounded: need.rounding.apply(quantity),
                }
            })
            .collect();

        Ok(NeedsReport { population, needs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metadata::NeedDefinition;
    use crate::domain::model::RoundingRule;

    #[test]
    fn test_bnpb_needs_for_fifty_people() {
        let report = NeedsCalculator::calculate(50.0, &NeedsProfile::bnpb_default()).unwrap();

        assert_eq!(report.needs.len(), 5);
        assert_eq!(report.get("Rice").unwrap().rounded, 140.0);
        assert_eq!(report.get("Drinking Water").unwrap().rounded, 875.0);
        assert_eq!(report.get("Clean Water").unwrap().rounded, 3350.0);
        assert_eq!(report.get("Family Kits").unwrap().rounded, 10.0);
        assert_eq!(report.get("Toilets").unwrap().rounded, 3.0);
    }

    #[test]
    fn test_rounding_rule_per_category() {
        let profile = NeedsProfile {
            name: "test".to_string(),
            needs: vec![
                NeedDefinition::new("Blankets", "unit", "single", 0.3, RoundingRule::Down),
                NeedDefinition::new("Tents", "unit", "single", 0.3, RoundingRule::Up),
                NeedDefinition::new("Soap", "bar", "weekly", 0.3, RoundingRule::Nearest),
            ],
        };

        let report = NeedsCalculator::calculate(11.0, &profile).unwrap();
        assert_eq!(report.needs[0].rounded, 3.0);
        assert_eq!(report.needs[1].rounded, 4.0);
        assert_eq!(report.needs[2].rounded, 3.0);
        assert!((report.needs[2].quantity - 3.3).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_coefficients_rejected() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let profile = NeedsProfile {
                name: "bad".to_string(),
                needs: vec![NeedDefinition::new("Rice", "kg", "weekly", bad, RoundingRule::Nearest)],
            };
            assert!(matches!(
                NeedsCalculator::calculate(10.0, &profile),
                Err(ImpactError::InvalidNeedsProfileError { .. })
            ));
        }
    }

    #[test]
    fn test_zero_population_gives_zero_needs() {
        let report = NeedsCalculator::calculate(0.0, &NeedsProfile::bnpb_default()).unwrap();
        assert!(report.needs.iter().all(|n| n.rounded == 0.0));
    }
}
