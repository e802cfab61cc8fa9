//! Monte-Carlo aggregation over independent replication runs.
//!
//! All trials of a batch (and all batches of a sweep) draw from one seeded
//! source in trial order, so a seed reproduces the full sequence of results.
//! Each trial still owns its own path, option, portfolios and ledger.

use crate::errors::{SimError, SimResult};
use crate::paper::simulator::HedgeSimulator;
use crate::state::{RunConfig, RunResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::statistics::Statistics;
use std::collections::HashSet;

/// Run `n` full simulations and collect their terminal results in trial order.
pub fn run_many(config: &RunConfig, n: usize, seed: Option<u64>) -> SimResult<Vec<RunResult>> {
    let mut rng = seeded_rng(seed);
    run_many_with_rng(config, n, &mut rng)
}

pub fn run_many_with_rng<R: Rng + ?Sized>(
    config: &RunConfig,
    n: usize,
    rng: &mut R,
) -> SimResult<Vec<RunResult>> {
    config.validate()?;
    tracing::info!(
        trials = n,
        rebalances_per_day = config.rebalances_per_day,
        maturity_days = config.maturity_days,
        "starting batch"
    );

    let mut results = Vec::with_capacity(n);
    for trial in 0..n {
        let mut sim = HedgeSimulator::with_rng(config, &mut *rng)?;
        sim.simulate();
        let result = sim.terminal_stats().map_err(|e| {
            tracing::error!(trial, error = %e, "trial produced no usable result");
            e
        })?;
        tracing::debug!(
            trial,
            absolute_diff = result.absolute_diff,
            relative_diff = result.relative_diff,
            "trial finished"
        );
        results.push(result);
    }

    tracing::info!(trials = results.len(), "batch finished");
    Ok(results)
}

/// Location and spread of one difference column across a batch.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct DiffStats {
    pub mean: f64,
    /// Sample standard deviation; 0 for a single trial.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl DiffStats {
    fn from_values(values: &[f64]) -> Self {
        let std_dev = if values.len() < 2 {
            0.0
        } else {
            values.iter().std_dev()
        };
        Self {
            mean: values.iter().mean(),
            std_dev,
            min: Statistics::min(values.iter()),
            max: Statistics::max(values.iter()),
        }
    }
}

/// Summary of a batch of trials.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BatchSummary {
    pub trials: usize,
    pub absolute_diff: DiffStats,
    pub relative_diff: DiffStats,
}

impl BatchSummary {
    pub fn from_results(results: &[RunResult]) -> SimResult<Self> {
        if results.is_empty() {
            return Err(SimError::DegenerateComputation(
                "cannot summarize an empty batch".to_string(),
            ));
        }
        let absolute: Vec<f64> = results.iter().map(|r| r.absolute_diff).collect();
        let relative: Vec<f64> = results.iter().map(|r| r.relative_diff).collect();
        Ok(Self {
            trials: results.len(),
            absolute_diff: DiffStats::from_values(&absolute),
            relative_diff: DiffStats::from_values(&relative),
        })
    }
}

/// One rebalancing frequency of a sweep.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SweepPoint {
    pub rebalances_per_day: u32,
    pub summary: BatchSummary,
    pub results: Vec<RunResult>,
}

/// Run a batch of `n` trials per frequency, in the given order, from one
/// seeded source. Shows how replication error shrinks as hedging gets finer.
pub fn frequency_sweep(
    config: &RunConfig,
    frequencies: &[u32],
    n: usize,
    seed: Option<u64>,
) -> SimResult<Vec<SweepPoint>> {
    if frequencies.is_empty() {
        return Err(SimError::InvalidParameter(
            "frequency sweep needs at least one frequency".to_string(),
        ));
    }
    if let Some(dup) = first_repeat(frequencies) {
        return Err(SimError::InvalidParameter(format!(
            "frequency sweep lists {dup} rebalances per day more than once"
        )));
    }

    let mut rng = seeded_rng(seed);
    let mut points = Vec::with_capacity(frequencies.len());
    for &freq in frequencies {
        let cfg = RunConfig {
            rebalances_per_day: freq,
            ..*config
        };
        let results = run_many_with_rng(&cfg, n, &mut rng)?;
        let summary = BatchSummary::from_results(&results)?;
        tracing::info!(
            rebalances_per_day = freq,
            mean_relative_diff = summary.relative_diff.mean,
            std_relative_diff = summary.relative_diff.std_dev,
            "sweep point done"
        );
        points.push(SweepPoint {
            rebalances_per_day: freq,
            summary,
            results,
        });
    }
    Ok(points)
}

/// First value that appears twice, if any.
pub(crate) fn first_repeat(values: &[u32]) -> Option<u32> {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().copied().find(|v| !seen.insert(*v))
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_config() -> RunConfig {
        RunConfig {
            spot: 100.0,
            strike: 100.0,
            sigma: 0.25,
            risk_free_rate: 0.03,
            maturity_days: 252.0,
            rebalances_per_day: 1,
            starting_cash: 100_000.0,
            target_quantity: 500.0,
            expected_return: 0.073,
        }
    }

    #[test]
    fn test_run_many_count_and_reproducibility() {
        let cfg = reference_config();
        let a = run_many(&cfg, 100, Some(0)).unwrap();
        assert_eq!(a.len(), 100);
        let b = run_many(&cfg, 100, Some(0)).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|r| r.replicating_mv > 0.0 && r.benchmark_mv > 0.0));
    }

    #[test]
    fn test_trials_are_distinct() {
        let results = run_many(&reference_config(), 5, Some(1)).unwrap();
        for pair in results.windows(2) {
            assert_ne!(pair[0], pair[1], "consecutive trials must draw different paths");
        }
    }

    #[test]
    fn test_first_trial_matches_single_run() {
        let cfg = reference_config();
        let batch = run_many(&cfg, 3, Some(21)).unwrap();
        let mut single = HedgeSimulator::new(&cfg, Some(21)).unwrap();
        single.simulate();
        assert_eq!(batch[0], single.terminal_stats().unwrap());
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let cfg = RunConfig { maturity_days: 1.5, ..reference_config() };
        assert!(matches!(
            run_many(&cfg, 10, Some(0)),
            Err(SimError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_zero_trials_is_empty() {
        let results = run_many(&reference_config(), 0, Some(0)).unwrap();
        assert!(results.is_empty());
        assert!(matches!(
            BatchSummary::from_results(&results),
            Err(SimError::DegenerateComputation(_))
        ));
    }

    #[test]
    fn test_summary_statistics() {
        let results: Vec<RunResult> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|&d| RunResult {
                replicating_mv: 100.0 + d,
                benchmark_mv: 100.0,
                absolute_diff: d,
                relative_diff: d / 100.0,
            })
            .collect();
        let s = BatchSummary::from_results(&results).unwrap();
        assert_eq!(s.trials, 4);
        assert!((s.absolute_diff.mean - 2.5).abs() < 1e-12);
        assert!((s.absolute_diff.std_dev - (5.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(s.absolute_diff.min, 1.0);
        assert_eq!(s.absolute_diff.max, 4.0);
        assert!((s.relative_diff.mean - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_single_trial_has_zero_spread() {
        let results = run_many(&reference_config(), 1, Some(4)).unwrap();
        let s = BatchSummary::from_results(&results).unwrap();
        assert_eq!(s.relative_diff.std_dev, 0.0);
        assert_eq!(s.relative_diff.min, s.relative_diff.max);
    }

    #[test]
    fn test_finer_hedging_reduces_error() {
        let cfg = RunConfig { maturity_days: 63.0, risk_free_rate: 0.0, ..reference_config() };
        let sweep = frequency_sweep(&cfg, &[1, 16], 60, Some(12)).unwrap();
        assert_eq!(sweep.len(), 2);
        assert_eq!(sweep[0].rebalances_per_day, 1);
        assert_eq!(sweep[1].results.len(), 60);
        let coarse = sweep[0].summary.relative_diff.std_dev;
        let fine = sweep[1].summary.relative_diff.std_dev;
        assert!(fine < coarse, "fine={fine} should be below coarse={coarse}");
    }

    #[test]
    fn test_sweep_is_reproducible() {
        let cfg = RunConfig { maturity_days: 10.0, ..reference_config() };
        let a = frequency_sweep(&cfg, &[1, 2], 5, Some(3)).unwrap();
        let b = frequency_sweep(&cfg, &[1, 2], 5, Some(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_repeated_sweep_frequency_rejected() {
        // would otherwise run every batch before failing on storage
        let err = frequency_sweep(&reference_config(), &[1, 2, 1], 5, Some(0)).unwrap_err();
        match err {
            SimError::InvalidParameter(msg) => assert!(msg.contains('1'), "msg={msg}"),
            other => panic!("expected invalid parameter, got {other:?}"),
        }
        assert_eq!(first_repeat(&[4, 2, 8, 2, 4]), Some(2));
        assert_eq!(first_repeat(&[1, 2, 4]), None);
    }

    #[test]
    fn test_empty_sweep_rejected() {
        assert!(matches!(
            frequency_sweep(&reference_config(), &[], 5, Some(0)),
            Err(SimError::InvalidParameter(_))
        ));
    }
}
