use serde::{Deserialize, Serialize};

/// Multiset of observed scalar values. Standard deviation, median and the
/// quartiles are not computable from partial sums alone, so merged partials
/// carry the full value list; count, sum and extrema are answered without a
/// sort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    values: Vec<f64>,
}

impl Distribution {
    pub fn observe(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn merge(&mut self, mut other: Distribution) {
        self.values.append(&mut other.values);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn count(&self) -> u64 {
        self.values.len() as u64
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum() / self.values.len() as f64
        }
    }

    pub fn min(&self) -> f64 {
        self.values.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Sample standard deviation; defined as 0 for fewer than 2 observations.
    pub fn sample_stdev(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let ss: f64 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1) as f64).sqrt()
    }

    /// Index-based quartiles: sorted[n/4], sorted[n/2], sorted[3n/4].
    /// Matches the upstream convention rather than interpolating.
    pub fn quartiles(&self) -> (f64, f64, f64) {
        let n = self.values.len();
        if n == 0 {
            return (0.0, 0.0, 0.0);
        }
        let sorted = self.sorted();
        (sorted[n / 4], sorted[n / 2], sorted[3 * n / 4])
    }

    /// Median via the same index convention; 0 when empty.
    pub fn median(&self) -> f64 {
        self.quartiles().1
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite observation"));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(values: &[f64]) -> Distribution {
        let mut d = Distribution::default();
        for &v in values {
            d.observe(v);
        }
        d
    }

    #[test]
    fn basic_moments() {
        let d = dist(&[20.0, 22.0, 24.0]);
        assert_eq!(d.count(), 3);
        assert_eq!(d.mean(), 22.0);
        assert_eq!(d.min(), 20.0);
        assert_eq!(d.max(), 24.0);
        assert_eq!(d.sample_stdev(), 2.0);
    }

    #[test]
    fn stdev_undefined_below_two_observations() {
        assert_eq!(dist(&[]).sample_stdev(), 0.0);
        assert_eq!(dist(&[5.0]).sample_stdev(), 0.0);
    }

    #[test]
    fn empty_distribution_medians_to_zero() {
        assert_eq!(dist(&[]).median(), 0.0);
        assert_eq!(dist(&[]).quartiles(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn quartiles_use_index_convention() {
        let d = dist(&[4.0, 1.0, 3.0, 2.0]);
        // sorted = [1,2,3,4]; q1 = idx 1, median = idx 2, q3 = idx 3
        assert_eq!(d.quartiles(), (2.0, 3.0, 4.0));
    }

    #[test]
    fn merge_is_order_independent() {
        let mut a = dist(&[1.0, 2.0]);
        a.merge(dist(&[3.0]));
        let mut b = dist(&[3.0]);
        b.merge(dist(&[1.0, 2.0]));
        assert_eq!(a.mean(), b.mean());
        assert_eq!(a.median(), b.median());
        assert_eq!(a.sample_stdev(), b.sample_stdev());
    }

    #[test]
    fn merge_with_identity_is_noop() {
        let mut d = dist(&[1.5, 2.5]);
        let before = d.clone();
        d.merge(Distribution::default());
        assert_eq!(d, before);
    }
}
