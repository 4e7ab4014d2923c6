/// Rounds a population figure up for display: to 10 below 1 000, to 100 below
/// 100 000, otherwise to 1 000. Returns the rounded value and the step used.
pub fn population_rounding(value: f64) -> (f64, f64) {
    let step = if value < 1_000.0 {
        10.0
    } else if value < 100_000.0 {
        100.0
    } else {
        1_000.0
    };
    if value <= 0.0 || !value.is_finite() {
        return (0.0, step);
    }
    ((value / step).ceil() * step, step)
}

/// Display value only.
pub fn round_population(value: f64) -> f64 {
    population_rounding(value).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_rounding_steps() {
        assert_eq!(population_rounding(0.0), (0.0, 10.0));
        assert_eq!(population_rounding(3.2), (10.0, 10.0));
        assert_eq!(population_rounding(50.0), (50.0, 10.0));
        assert_eq!(population_rounding(999.1), (1_000.0, 10.0));
        assert_eq!(population_rounding(1_001.0), (1_100.0, 100.0));
        assert_eq!(population_rounding(123_456.0), (124_000.0, 1_000.0));
    }

    #[test]
    fn test_non_finite_rounds_to_zero() {
        assert_eq!(round_population(f64::NAN), 0.0);
        assert_eq!(round_population(-4.0), 0.0);
    }
}
