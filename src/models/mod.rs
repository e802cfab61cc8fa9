pub mod black_scholes;

pub use black_scholes::CallOption;

/// Day-count convention shared by pricing, path generation and interest accrual.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
