pub mod error;
pub mod market_csv;
pub mod provider;
pub mod yahoo;
