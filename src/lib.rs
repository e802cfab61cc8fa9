//! Discrete-time delta-hedging simulator for a European call.
//!
//! A replicating portfolio re-targets `delta * target_quantity` units of the
//! underlying at every rebalancing step, while a benchmark portfolio simply
//! holds the call. Comparing their terminal values across many simulated
//! paths measures replication error as a function of hedging frequency.

pub mod config;
pub mod db;
pub mod errors;
pub mod feeds;
pub mod models;
pub mod paper;
pub mod state;

pub use errors::{SimError, SimResult};
pub use feeds::PricePath;
pub use models::{CallOption, TRADING_DAYS_PER_YEAR};
pub use paper::{frequency_sweep, run_many, BatchSummary, HedgeSimulator, Ledger, RunHandle};
pub use state::{EngineState, InitialConditions, LedgerRow, Portfolio, RunConfig, RunResult};
