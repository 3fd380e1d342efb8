// Record model, filtering and aggregation for phase-level cricket matchup
// data.

pub mod config;
pub mod context;
pub mod filter;
pub mod key;
pub mod records;
pub mod span;
pub mod stats;
pub mod store;
pub mod teams;
