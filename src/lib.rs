/// Dabar - Biblical-term dictionary distribution and lookup engine
///
/// Core library providing shard building, lazy dictionary loading,
/// verse word matching and offline warmup for scripture reading apps.

pub mod config;
pub mod dictionary;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
