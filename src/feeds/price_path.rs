use crate::errors::{SimError, SimResult};
use crate::models::TRADING_DAYS_PER_YEAR;
use rand::Rng;
use rand_distr::{Distribution, LogNormal};

/// Simulated underlying prices, one per rebalancing step plus the start.
///
/// `offsets[i]` is the elapsed time in days of `prices[i]`. Offset 0 always
/// carries the initial price. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePath {
    offsets: Vec<f64>,
    prices: Vec<f64>,
}

impl PricePath {
    pub fn new(offsets: Vec<f64>, prices: Vec<f64>) -> SimResult<Self> {
        if offsets.len() != prices.len() {
            return Err(SimError::InvalidParameter(format!(
                "price path has {} offsets but {} prices",
                offsets.len(),
                prices.len()
            )));
        }
        if prices.is_empty() {
            return Err(SimError::InvalidParameter("price path is empty".to_string()));
        }
        Ok(Self { offsets, prices })
    }

    /// Draw a log-normal path.
    ///
    /// Per-step parameters: mu = er / (252 * steps_per_day),
    /// sigma = vol / sqrt(252 * steps_per_day). Each step multiplies the
    /// previous price by an independent LogNormal(mu, sigma) return.
    /// The whole path is materialized up front; `rng` is the only source of
    /// randomness.
    pub fn generate<R: Rng + ?Sized>(
        initial_price: f64,
        expected_return: f64,
        volatility: f64,
        total_days: u32,
        steps_per_day: u32,
        rng: &mut R,
    ) -> SimResult<Self> {
        if steps_per_day == 0 {
            return Err(SimError::InvalidParameter(
                "steps_per_day must be positive".to_string(),
            ));
        }

        let steps_per_year = TRADING_DAYS_PER_YEAR * steps_per_day as f64;
        let step_mean = expected_return / steps_per_year;
        let step_vol = volatility / steps_per_year.sqrt();
        let returns = LogNormal::new(step_mean, step_vol).map_err(|e| {
            SimError::InvalidParameter(format!("log-normal step ({step_mean}, {step_vol}): {e}"))
        })?;

        let total_steps = total_days as usize * steps_per_day as usize;
        let mut offsets = Vec::with_capacity(total_steps + 1);
        let mut prices = Vec::with_capacity(total_steps + 1);
        offsets.push(0.0);
        prices.push(initial_price);

        let mut price = initial_price;
        for step in 1..=total_steps {
            price *= returns.sample(rng);
            offsets.push(step as f64 / steps_per_day as f64);
            prices.push(price);
        }

        Self::new(offsets, prices)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    #[inline]
    pub fn price(&self, step: usize) -> Option<f64> {
        self.prices.get(step).copied()
    }

    #[inline]
    pub fn offset(&self, step: usize) -> Option<f64> {
        self.offsets.get(step).copied()
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mismatched_lengths_rejected() {
        let r = PricePath::new(vec![0.0, 1.0], vec![100.0]);
        assert!(matches!(r, Err(SimError::InvalidParameter(_))));
    }

    #[test]
    fn test_length_and_first_point() {
        let mut rng = StdRng::seed_from_u64(7);
        for &(days, freq) in &[(1u32, 1u32), (10, 4), (252, 1), (21, 8)] {
            let path = PricePath::generate(123.45, 0.07, 0.2, days, freq, &mut rng).unwrap();
            assert_eq!(path.len(), (days * freq + 1) as usize);
            assert_eq!(path.price(0), Some(123.45));
            assert_eq!(path.offset(0), Some(0.0));
            assert_eq!(path.offset(path.len() - 1), Some(days as f64));
        }
    }

    #[test]
    fn test_prices_stay_positive() {
        let mut rng = StdRng::seed_from_u64(11);
        let path = PricePath::generate(100.0, 0.0, 0.8, 252, 4, &mut rng).unwrap();
        assert!(path.prices().iter().all(|p| *p > 0.0 && p.is_finite()));
    }

    #[test]
    fn test_same_seed_same_path() {
        let a = PricePath::generate(100.0, 0.1, 0.3, 50, 2, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = PricePath::generate(100.0, 0.1, 0.3, 50, 2, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_vol_is_pure_drift() {
        let mut rng = StdRng::seed_from_u64(0);
        let path = PricePath::generate(100.0, 0.252, 0.0, 10, 1, &mut rng).unwrap();
        // mu per step = 0.001, so each step multiplies by e^0.001
        let expected = 100.0 * (0.01_f64).exp();
        let last = path.price(10).unwrap();
        assert!((last - expected).abs() < 1e-9, "last={last} expected={expected}");
    }

    #[test]
    fn test_zero_steps_per_day_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let r = PricePath::generate(100.0, 0.1, 0.3, 10, 0, &mut rng);
        assert!(matches!(r, Err(SimError::InvalidParameter(_))));
    }
}
