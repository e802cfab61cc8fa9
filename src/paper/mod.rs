pub mod batch;
pub mod ledger;
pub mod simulator;

pub use batch::{frequency_sweep, run_many, BatchSummary, DiffStats, SweepPoint};
pub use ledger::Ledger;
pub use simulator::{HedgeSimulator, RunHandle};
