/// Neumaier-compensated running sum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StableSum {
    sum: f64,
    compensation: f64,
}

impl StableSum {
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    /// Folds another partial sum in, keeping both compensation terms.
    pub fn merge(&mut self, other: &StableSum) {
        self.add(other.sum);
        self.add(other.compensation);
    }

    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl FromIterator<f64> for StableSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut sum = StableSum::default();
        for v in iter {
            sum.add(v);
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compensates_small_terms() {
        let mut naive = 1.0e16;
        let mut stable = StableSum::default();
        stable.add(1.0e16);
        for _ in 0..10 {
            naive += 1.0;
            stable.add(1.0);
        }
        assert_eq!(stable.value(), 1.0e16 + 10.0);
        assert_ne!(naive, 1.0e16 + 10.0);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let values: Vec<f64> = (0..1000).map(|i| 0.1 * i as f64).collect();
        let whole: StableSum = values.iter().copied().collect();

        let mut left: StableSum = values[..400].iter().copied().collect();
        let right: StableSum = values[400..].iter().copied().collect();
        left.merge(&right);

        assert!((whole.value() - left.value()).abs() < 1e-9);
    }
}
