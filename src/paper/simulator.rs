use crate::errors::{SimError, SimResult};
use crate::feeds::PricePath;
use crate::models::{CallOption, TRADING_DAYS_PER_YEAR};
use crate::paper::ledger::Ledger;
use crate::state::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ═══════════════════════════════════════════════════════════════════════════════
// DELTA-HEDGED CALL REPLICATION
//
// Two portfolios start with the same cash and walk the same price path:
//
// 1. REPLICA: holds delta * target_quantity units of the underlying,
//    re-targeted at every step. Never touches the option.
// 2. BENCHMARK: buys target_quantity calls on the first step and holds them
//    to expiry.
//
// Both cash balances earn the risk-free rate each step. The option price
// already discounts at r, so skipping accrual would bias the comparison.
//
// At expiry the option is worth its payoff and delta is 0, so the replica is
// fully liquidated on the last step and both portfolios are pure cash plus
// (for the benchmark) the payoff.
// ═══════════════════════════════════════════════════════════════════════════════

/// One replication run. Owns its path, option, portfolios and ledger.
///
/// Step 0 is recorded at construction. Each `rebalance()` performs exactly
/// one step; after `total_days * rebalances_per_day` steps the run is
/// `Expired` and further calls do nothing.
#[derive(Debug, Clone)]
pub struct HedgeSimulator {
    config: RunConfig,
    initial: InitialConditions,
    /// Option as of step 0; every later view is derived from it.
    base_option: CallOption,
    option: CallOption,
    path: PricePath,
    replica: Portfolio,
    benchmark: Portfolio,
    step: u32,
    total_steps: u32,
    state: EngineState,
    ledger: Ledger,
}

/// Handle returned by the construction interface.
pub type RunHandle = HedgeSimulator;

impl HedgeSimulator {
    /// Build a run with its own random source. `None` seeds from OS entropy.
    pub fn new(config: &RunConfig, seed: Option<u64>) -> SimResult<Self> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, &mut rng)
    }

    /// Build a run drawing its path from a caller-owned random source.
    pub fn with_rng<R: Rng + ?Sized>(config: &RunConfig, rng: &mut R) -> SimResult<Self> {
        config.validate()?;
        let path = PricePath::generate(
            config.spot,
            config.expected_return,
            config.sigma,
            config.total_days(),
            config.rebalances_per_day,
            rng,
        )?;
        Self::from_path(config, path)
    }

    /// Build a run over an explicit path. The path must have exactly
    /// `total_steps + 1` points.
    pub fn from_path(config: &RunConfig, path: PricePath) -> SimResult<Self> {
        config.validate()?;
        let total_steps = config.total_steps();
        if path.len() != total_steps as usize + 1 {
            return Err(SimError::InvalidParameter(format!(
                "price path has {} points, run needs {}",
                path.len(),
                total_steps + 1
            )));
        }

        let base_option = CallOption::new(
            config.spot,
            config.strike,
            config.sigma,
            config.risk_free_rate,
            // same day count the step total is built from
            f64::from(config.total_days()),
        )?;
        let option = base_option.reprice(path.prices()[0]);

        let mut sim = Self {
            config: *config,
            initial: InitialConditions::from(config),
            base_option,
            option,
            replica: Portfolio::with_cash(config.starting_cash, path.prices()[0]),
            benchmark: Portfolio::with_cash(config.starting_cash, option.price()),
            path,
            step: 0,
            total_steps,
            state: EngineState::Initialized,
            ledger: Ledger::with_capacity(total_steps as usize + 1),
        };
        sim.record();

        tracing::debug!(
            total_steps,
            spot = config.spot,
            strike = config.strike,
            call_price = option.price(),
            "replication run initialized"
        );
        Ok(sim)
    }

    /// Run every remaining step. Returns how many steps this call performed.
    pub fn simulate(&mut self) -> u32 {
        let start = self.step;
        while self.state != EngineState::Expired {
            self.rebalance();
        }
        let performed = self.step - start;
        if performed > 0 {
            if let Some(last) = self.ledger.last() {
                tracing::info!(
                    steps = performed,
                    replica_mv = last.replica_mv,
                    benchmark_mv = last.benchmark_mv,
                    "replication run expired"
                );
            }
        }
        performed
    }

    /// One discrete step. No-op once expired.
    pub fn rebalance(&mut self) -> EngineState {
        if self.state == EngineState::Expired {
            return self.state;
        }

        let step = self.step + 1;
        let spot = self.path.prices()[step as usize];
        let dt = 1.0 / self.config.rebalances_per_day as f64;
        let elapsed_days = step as f64 / self.config.rebalances_per_day as f64;

        // 1. Reprice and age the option from its step-0 value
        self.option = self.base_option.aged(elapsed_days, spot);
        let call_price = self.option.price();
        let call_delta = self.option.delta();

        // 2. Risk-free accrual on both cash balances
        let accrual = 1.0 + self.config.risk_free_rate / TRADING_DAYS_PER_YEAR * dt;
        self.replica.accrue(accrual);
        self.benchmark.accrue(accrual);

        // 3. Benchmark: one-time purchase on leaving `Initialized`, mark-to-model after
        match self.state {
            EngineState::Initialized => {
                self.benchmark
                    .trade(self.initial.target_option_quantity, call_price);
                self.state = EngineState::Rebalancing;
                tracing::debug!(
                    quantity = self.initial.target_option_quantity,
                    price = call_price,
                    "benchmark bought calls"
                );
            }
            EngineState::Rebalancing | EngineState::Expired => self.benchmark.mark(call_price),
        }

        // 4. Replica: re-target holding to delta * target_quantity
        let trade_qty = call_delta * self.initial.target_option_quantity - self.replica.quantity;
        self.replica.trade(trade_qty, spot);
        tracing::trace!(step, spot, call_delta, trade_qty, "replica rebalanced");

        self.step = step;
        if self.step >= self.total_steps || self.option.expired() {
            self.state = EngineState::Expired;
        }

        // 5. Snapshot
        self.record();
        self.state
    }

    fn record(&mut self) {
        self.ledger.add(LedgerRow {
            timepoint: self.step as f64 / self.config.rebalances_per_day as f64,
            replica_quantity: self.replica.quantity,
            asset_price: self.replica.reference_price,
            replica_cash: self.replica.cash,
            replica_mv: self.replica.market_value(),
            call_delta: self.option.delta(),
            call_price: self.option.price(),
            benchmark_quantity: self.benchmark.quantity,
            benchmark_cash: self.benchmark.cash,
            benchmark_mv: self.benchmark.market_value(),
        });
    }

    /// Ordered ledger rows for external reporting.
    pub fn export(&self) -> &[LedgerRow] {
        self.ledger.export()
    }

    pub fn terminal_stats(&self) -> SimResult<RunResult> {
        self.ledger.terminal_stats()
    }

    #[inline]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[inline]
    pub fn steps_taken(&self) -> u32 {
        self.step
    }

    #[inline]
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn path(&self) -> &PricePath {
        &self.path
    }

    pub fn option(&self) -> &CallOption {
        &self.option
    }

    pub fn replica(&self) -> &Portfolio {
        &self.replica
    }

    pub fn benchmark(&self) -> &Portfolio {
        &self.benchmark
    }

    pub fn initial_conditions(&self) -> &InitialConditions {
        &self.initial
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}
