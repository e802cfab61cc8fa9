//! Append-only record of a replication run.
//! One row per step; read-only once the run has expired.

use crate::errors::{SimError, SimResult};
use crate::state::{LedgerRow, RunResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    rows: Vec<LedgerRow>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(steps: usize) -> Self {
        Self {
            rows: Vec::with_capacity(steps),
        }
    }

    /// The only mutator.
    #[inline]
    pub fn add(&mut self, row: LedgerRow) {
        self.rows.push(row);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&LedgerRow> {
        self.rows.last()
    }

    /// Full ordered history for an external reporter.
    pub fn export(&self) -> &[LedgerRow] {
        &self.rows
    }

    /// Terminal figures from the last row only.
    ///
    /// A benchmark worth exactly zero leaves the relative difference undefined;
    /// that is reported as `DegenerateComputation`, never as inf/NaN.
    pub fn terminal_stats(&self) -> SimResult<RunResult> {
        let last = self
            .rows
            .last()
            .ok_or_else(|| SimError::DegenerateComputation("ledger is empty".to_string()))?;

        if last.benchmark_mv == 0.0 {
            return Err(SimError::DegenerateComputation(format!(
                "benchmark market value is zero at t={}",
                last.timepoint
            )));
        }

        Ok(RunResult {
            replicating_mv: last.replica_mv,
            benchmark_mv: last.benchmark_mv,
            absolute_diff: last.replica_mv - last.benchmark_mv,
            relative_diff: last.replica_mv / last.benchmark_mv - 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(t: f64, replica_mv: f64, benchmark_mv: f64) -> LedgerRow {
        LedgerRow {
            timepoint: t,
            replica_quantity: 0.0,
            asset_price: 100.0,
            replica_cash: replica_mv,
            replica_mv,
            call_delta: 0.0,
            call_price: 0.0,
            benchmark_quantity: 0.0,
            benchmark_cash: benchmark_mv,
            benchmark_mv,
        }
    }

    #[test]
    fn test_terminal_stats_use_last_row() {
        let mut ledger = Ledger::new();
        ledger.add(row(0.0, 1_000.0, 1_000.0));
        ledger.add(row(1.0, 1_100.0, 1_000.0));
        let stats = ledger.terminal_stats().unwrap();
        assert_eq!(stats.replicating_mv, 1_100.0);
        assert_eq!(stats.benchmark_mv, 1_000.0);
        assert_eq!(stats.absolute_diff, 100.0);
        assert!((stats.relative_diff - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_benchmark_is_degenerate() {
        let mut ledger = Ledger::new();
        ledger.add(row(0.0, 1_000.0, 0.0));
        assert!(matches!(
            ledger.terminal_stats(),
            Err(SimError::DegenerateComputation(_))
        ));
    }

    #[test]
    fn test_empty_ledger_is_degenerate() {
        assert!(matches!(
            Ledger::new().terminal_stats(),
            Err(SimError::DegenerateComputation(_))
        ));
    }

    #[test]
    fn test_export_preserves_order() {
        let mut ledger = Ledger::with_capacity(3);
        for i in 0..3 {
            ledger.add(row(i as f64, 1.0, 1.0));
        }
        let times: Vec<f64> = ledger.export().iter().map(|r| r.timepoint).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
    }
}
