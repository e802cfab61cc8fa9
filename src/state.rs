use crate::errors::{SimError, SimResult};

// ── Run State Machine ──

/// Lifecycle of a single replication run.
///
/// `Initialized` -> `Rebalancing` happens on the first step, which is also
/// the only place the benchmark buys its option position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Initialized,
    Rebalancing,
    Expired,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized => write!(f, "initialized"),
            Self::Rebalancing => write!(f, "rebalancing"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

// ── Run configuration ──

/// Everything needed to build one run. Shared read-only across trials.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunConfig {
    pub spot: f64,
    pub strike: f64,
    pub sigma: f64,
    pub risk_free_rate: f64,
    /// Option maturity in trading days; must be a whole number.
    pub maturity_days: f64,
    pub rebalances_per_day: u32,
    pub starting_cash: f64,
    pub target_quantity: f64,
    /// Annualized drift of the simulated underlying.
    pub expected_return: f64,
}

/// One hundred trading years.
pub const MAX_MATURITY_DAYS: f64 = 25_200.0;
/// Upper bound on the steps of one run; each step holds a path point and a ledger row.
pub const MAX_TOTAL_STEPS: u32 = 50_000_000;

impl RunConfig {
    /// Construction-time validation. Nothing is checked again once a run starts.
    pub fn validate(&self) -> SimResult<()> {
        positive("spot", self.spot)?;
        positive("strike", self.strike)?;
        positive("sigma", self.sigma)?;
        finite("risk_free_rate", self.risk_free_rate)?;
        finite("starting_cash", self.starting_cash)?;
        finite("target_quantity", self.target_quantity)?;
        finite("expected_return", self.expected_return)?;

        whole_days(self.maturity_days)?;
        if self.maturity_days < 1.0 {
            return Err(SimError::InvalidParameter(format!(
                "maturity_days must be at least 1, got {}",
                self.maturity_days
            )));
        }
        if self.maturity_days > MAX_MATURITY_DAYS {
            return Err(SimError::InvalidParameter(format!(
                "maturity_days must be at most {MAX_MATURITY_DAYS}, got {}",
                self.maturity_days
            )));
        }
        if self.rebalances_per_day == 0 {
            return Err(SimError::InvalidParameter(
                "rebalances_per_day must be positive".to_string(),
            ));
        }
        match self.total_days().checked_mul(self.rebalances_per_day) {
            Some(steps) if steps <= MAX_TOTAL_STEPS => Ok(()),
            _ => Err(SimError::InvalidParameter(format!(
                "{} days at {} rebalances per day exceeds {MAX_TOTAL_STEPS} steps",
                self.total_days(),
                self.rebalances_per_day
            ))),
        }
    }

    #[inline]
    pub fn total_days(&self) -> u32 {
        self.maturity_days.round() as u32
    }

    /// Only meaningful once `validate` has passed.
    #[inline]
    pub fn total_steps(&self) -> u32 {
        self.total_days() * self.rebalances_per_day
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            spot: 100.0,
            strike: 100.0,
            sigma: 0.30,
            risk_free_rate: 0.0,
            maturity_days: 252.0,
            rebalances_per_day: 1,
            starting_cash: 10_000.0,
            target_quantity: 100.0,
            expected_return: 0.10,
        }
    }
}

/// Rejects day counts that are not exactly integral (or are negative / non-finite).
pub fn whole_days(days: f64) -> SimResult<()> {
    if !days.is_finite() || days < 0.0 || days.fract() != 0.0 {
        return Err(SimError::InvalidParameter(format!(
            "maturity must be a whole number of days, got {days}"
        )));
    }
    Ok(())
}

fn finite(name: &str, value: f64) -> SimResult<()> {
    if !value.is_finite() {
        return Err(SimError::InvalidParameter(format!("{name} must be finite, got {value}")));
    }
    Ok(())
}

fn positive(name: &str, value: f64) -> SimResult<()> {
    finite(name, value)?;
    if value <= 0.0 {
        return Err(SimError::InvalidParameter(format!("{name} must be positive, got {value}")));
    }
    Ok(())
}

// ── Initial conditions (fixed at run start) ──

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct InitialConditions {
    pub starting_cash: f64,
    pub target_option_quantity: f64,
    pub starting_spot: f64,
    pub expected_return: f64,
}

impl From<&RunConfig> for InitialConditions {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            starting_cash: cfg.starting_cash,
            target_option_quantity: cfg.target_quantity,
            starting_spot: cfg.spot,
            expected_return: cfg.expected_return,
        }
    }
}

// ── Portfolio ──

/// Cash plus a single position marked at `reference_price`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Portfolio {
    pub cash: f64,
    pub quantity: f64,
    pub reference_price: f64,
}

impl Portfolio {
    pub fn with_cash(cash: f64, reference_price: f64) -> Self {
        Self {
            cash,
            quantity: 0.0,
            reference_price,
        }
    }

    #[inline]
    pub fn market_value(&self) -> f64 {
        self.quantity * self.reference_price + self.cash
    }

    #[inline]
    pub fn accrue(&mut self, factor: f64) {
        self.cash *= factor;
    }

    #[inline]
    pub fn mark(&mut self, price: f64) {
        self.reference_price = price;
    }

    /// Buy (positive) or sell (negative) `quantity` at `price`, settled in cash.
    #[inline]
    pub fn trade(&mut self, quantity: f64, price: f64) {
        self.reference_price = price;
        self.cash -= quantity * price;
        self.quantity += quantity;
    }
}

// ── Ledger rows and run results ──

/// One snapshot per step. Field order is the export column order.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LedgerRow {
    /// Elapsed time in days.
    pub timepoint: f64,
    pub replica_quantity: f64,
    pub asset_price: f64,
    pub replica_cash: f64,
    pub replica_mv: f64,
    pub call_delta: f64,
    pub call_price: f64,
    pub benchmark_quantity: f64,
    pub benchmark_cash: f64,
    pub benchmark_mv: f64,
}

impl LedgerRow {
    pub const COLUMNS: [&'static str; 10] = [
        "timepoint",
        "replica_quantity",
        "asset_price",
        "replica_cash",
        "replica_mv",
        "call_delta",
        "call_price",
        "benchmark_quantity",
        "benchmark_cash",
        "benchmark_mv",
    ];
}

/// Terminal figures of one trial.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RunResult {
    pub replicating_mv: f64,
    pub benchmark_mv: f64,
    pub absolute_diff: f64,
    pub relative_diff: f64,
}
