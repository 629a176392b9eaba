pub mod candle;
pub mod dashboard;
pub mod error;
pub mod figure;
pub mod panel;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod source;
pub mod timestamp;
