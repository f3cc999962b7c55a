pub mod addresses;
pub mod aggregator;
pub mod balance_cache;
pub mod balances;
mod block_resolver;
pub mod day_window;
pub mod env;
pub mod explorer;
mod health;
mod json_codecs;
pub mod log;
mod performance;
mod serve;
pub mod transactions;
pub mod units;

pub use serve::start_server;
