//! Run ledger for processing runs.
//!
//! Tracks how many samples, movements and sessions each run handled, and
//! keeps cumulative totals on disk for `status`.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log_with_persistence, load_totals, PersistedTotals, RunLog, RunStats,
    SharedRunLog,
};
