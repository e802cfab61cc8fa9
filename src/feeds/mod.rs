pub mod price_path;

pub use price_path::PricePath;
