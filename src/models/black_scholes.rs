use crate::errors::SimResult;
use crate::models::TRADING_DAYS_PER_YEAR;
use crate::state::whole_days;
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes European call.
///
/// d1 = [ln(S/K) + (r + sigma^2*T/2)] / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
/// C  = Phi(d1)*S - Phi(d2)*K*e^(-r*T),  delta = Phi(d1)
///
/// T is in years (trading days / 252). Once T <= 0 the option is expired:
/// price is the intrinsic payoff and delta is 0.
///
/// The value is `Copy`; `advance` and `reprice` return a new option rather
/// than mutating, so every step derives its own aged and repriced view.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CallOption {
    pub spot: f64,
    pub strike: f64,
    pub sigma: f64,
    pub risk_free_rate: f64,
    /// Remaining life in trading days.
    pub maturity_days: f64,
}

impl CallOption {
    /// Fails with `InvalidParameter` unless `maturity_days` is a whole number.
    pub fn new(
        spot: f64,
        strike: f64,
        sigma: f64,
        risk_free_rate: f64,
        maturity_days: f64,
    ) -> SimResult<Self> {
        whole_days(maturity_days)?;
        Ok(Self {
            spot,
            strike,
            sigma,
            risk_free_rate,
            maturity_days,
        })
    }

    /// Same option, `dt_days` closer to expiry.
    #[inline]
    #[must_use]
    pub fn advance(self, dt_days: f64) -> Self {
        Self {
            maturity_days: self.maturity_days - dt_days,
            ..self
        }
    }

    /// Same option observed at a new underlying price.
    #[inline]
    #[must_use]
    pub fn reprice(self, spot: f64) -> Self {
        Self { spot, ..self }
    }

    /// The option as seen `elapsed_days` after `self`, with the underlying at `spot`.
    #[inline]
    #[must_use]
    pub fn aged(self, elapsed_days: f64, spot: f64) -> Self {
        self.reprice(spot).advance(elapsed_days)
    }

    #[inline]
    pub fn maturity_years(&self) -> f64 {
        self.maturity_days / TRADING_DAYS_PER_YEAR
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.maturity_days <= 0.0
    }

    /// `None` once expired.
    pub fn d1(&self) -> Option<f64> {
        if self.expired() {
            return None;
        }
        let t = self.maturity_years();
        let sigma_sqrt_t = self.sigma * t.sqrt();
        let ln_s_k = (self.spot / self.strike).ln();
        Some((ln_s_k + (self.risk_free_rate + self.sigma * self.sigma * t / 2.0)) / sigma_sqrt_t)
    }

    /// `None` once expired.
    pub fn d2(&self) -> Option<f64> {
        self.d1()
            .map(|d1| d1 - self.sigma * self.maturity_years().sqrt())
    }

    #[inline]
    pub fn payoff(&self) -> f64 {
        (self.spot - self.strike).max(0.0)
    }

    pub fn price(&self) -> f64 {
        match (self.d1(), self.d2()) {
            (Some(d1), Some(d2)) => {
                let discount = (-self.risk_free_rate * self.maturity_years()).exp();
                norm_cdf(d1) * self.spot - norm_cdf(d2) * self.strike * discount
            }
            _ => self.payoff(),
        }
    }

    pub fn delta(&self) -> f64 {
        self.d1().map_or(0.0, norm_cdf)
    }
}

#[inline]
fn norm_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}
