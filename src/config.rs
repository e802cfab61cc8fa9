use crate::errors::{SimError, SimResult};
use crate::paper::batch::first_repeat;
use crate::state::RunConfig;
use std::path::PathBuf;
use std::str::FromStr;

/// What the binary does with a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One run, full ledger.
    Single,
    /// `trials` runs, terminal results only.
    Batch,
    /// One batch per rebalancing frequency.
    Sweep,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Batch => write!(f, "batch"),
            Self::Sweep => write!(f, "sweep"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub spot: f64,
    pub strike: f64,
    pub sigma: f64,
    pub risk_free_rate: f64,
    pub maturity_days: f64,
    pub rebalances_per_day: u32,
    pub starting_cash: f64,
    pub target_quantity: f64,
    pub expected_return: f64,
    pub seed: Option<u64>,
    pub trials: Option<usize>,
    pub sweep: Vec<u32>,
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> SimResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> SimResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let sweep = match lookup("HEDGE_SWEEP") {
            Some(raw) => parse_list::<u32>("HEDGE_SWEEP", &raw)?,
            None => Vec::new(),
        };
        if let Some(dup) = first_repeat(&sweep) {
            return Err(SimError::Config(format!("HEDGE_SWEEP: {dup} listed more than once")));
        }

        Ok(Self {
            spot: parse("HEDGE_SPOT", &var_or("HEDGE_SPOT", "100.0"))?,
            strike: parse("HEDGE_STRIKE", &var_or("HEDGE_STRIKE", "100.0"))?,
            sigma: parse("HEDGE_SIGMA", &var_or("HEDGE_SIGMA", "0.30"))?,
            risk_free_rate: parse("HEDGE_RF", &var_or("HEDGE_RF", "0.0"))?,
            maturity_days: parse("HEDGE_MATURITY_DAYS", &var_or("HEDGE_MATURITY_DAYS", "252"))?,
            rebalances_per_day: parse("HEDGE_FREQ", &var_or("HEDGE_FREQ", "1"))?,
            starting_cash: parse("HEDGE_CASH", &var_or("HEDGE_CASH", "10000"))?,
            target_quantity: parse("HEDGE_TARGET_QTY", &var_or("HEDGE_TARGET_QTY", "100"))?,
            expected_return: parse(
                "HEDGE_EXPECTED_RETURN",
                &var_or("HEDGE_EXPECTED_RETURN", "0.10"),
            )?,
            seed: lookup("HEDGE_SEED")
                .map(|raw| parse("HEDGE_SEED", &raw))
                .transpose()?,
            trials: lookup("HEDGE_TRIALS")
                .map(|raw| parse("HEDGE_TRIALS", &raw))
                .transpose()?,
            sweep,
            data_dir: PathBuf::from(var_or("HEDGE_DATA_DIR", "data")),
        })
    }

    pub fn mode(&self) -> RunMode {
        match (self.trials, self.sweep.is_empty()) {
            (Some(_), false) => RunMode::Sweep,
            (Some(_), true) => RunMode::Batch,
            (None, _) => RunMode::Single,
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            spot: self.spot,
            strike: self.strike,
            sigma: self.sigma,
            risk_free_rate: self.risk_free_rate,
            maturity_days: self.maturity_days,
            rebalances_per_day: self.rebalances_per_day,
            starting_cash: self.starting_cash,
            target_quantity: self.target_quantity,
            expected_return: self.expected_return,
        }
    }
}

fn parse<T>(key: &str, raw: &str) -> SimResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| SimError::Config(format!("{key}: {e}")))
}

fn parse_list<T>(key: &str, raw: &str) -> SimResult<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse(key, s))
        .collect()
}
