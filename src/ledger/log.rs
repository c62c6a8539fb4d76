//! Run ledger.
//!
//! Counts what a processing run consumed and produced. Counters are atomic so
//! worker threads can record without coordination; totals can be persisted
//! and accumulate across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Processing counters for the current run.
#[derive(Debug)]
pub struct RunLog {
    /// Samples read from session logs
    samples_read: AtomicU64,
    /// Movements with extracted features
    movements_extracted: AtomicU64,
    /// Move runs dropped for being too short
    short_runs_discarded: AtomicU64,
    /// Sessions that produced a fingerprint row
    sessions_processed: AtomicU64,
    /// Sessions that failed at any stage
    sessions_failed: AtomicU64,
    /// Rows appended to the sink
    rows_written: AtomicU64,
    run_id: Uuid,
    run_start: DateTime<Utc>,
    /// Path for persisting totals
    persist_path: Option<PathBuf>,
}

impl RunLog {
    /// Create a new run log.
    pub fn new() -> Self {
        Self {
            samples_read: AtomicU64::new(0),
            movements_extracted: AtomicU64::new(0),
            short_runs_discarded: AtomicU64::new(0),
            sessions_processed: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            run_id: Uuid::new_v4(),
            run_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a run log that continues from persisted totals.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("could not load previous run totals: {e}");
        }

        log
    }

    pub fn record_samples(&self, count: u64) {
        self.samples_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_movements(&self, count: u64) {
        self.movements_extracted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_short_runs(&self, count: u64) {
        self.short_runs_discarded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_session_processed(&self) {
        self.sessions_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_row_written(&self) {
        self.rows_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> RunStats {
        RunStats {
            run_id: self.run_id,
            samples_read: self.samples_read.load(Ordering::Relaxed),
            movements_extracted: self.movements_extracted.load(Ordering::Relaxed),
            short_runs_discarded: self.short_runs_discarded.load(Ordering::Relaxed),
            sessions_processed: self.sessions_processed.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_secs: (Utc::now() - self.run_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Run Statistics:\n\
             - Sessions processed: {}\n\
             - Sessions failed: {}\n\
             - Samples read: {}\n\
             - Movements extracted: {}\n\
             - Short runs discarded: {}\n\
             - Rows written: {}\n\
             - Run duration: {} seconds",
            stats.sessions_processed,
            stats.sessions_failed,
            stats.samples_read,
            stats.movements_extracted,
            stats.short_runs_discarded,
            stats.rows_written,
            stats.run_duration_secs
        )
    }

    /// Save totals to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedTotals {
                samples_read: stats.samples_read,
                movements_extracted: stats.movements_extracted,
                short_runs_discarded: stats.short_runs_discarded,
                sessions_processed: stats.sessions_processed,
                sessions_failed: stats.sessions_failed,
                rows_written: stats.rows_written,
                last_run_id: stats.run_id,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let persisted = load_totals(path)?;

                self.samples_read
                    .store(persisted.samples_read, Ordering::Relaxed);
                self.movements_extracted
                    .store(persisted.movements_extracted, Ordering::Relaxed);
                self.short_runs_discarded
                    .store(persisted.short_runs_discarded, Ordering::Relaxed);
                self.sessions_processed
                    .store(persisted.sessions_processed, Ordering::Relaxed);
                self.sessions_failed
                    .store(persisted.sessions_failed, Ordering::Relaxed);
                self.rows_written
                    .store(persisted.rows_written, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub run_id: Uuid,
    pub samples_read: u64,
    pub movements_extracted: u64,
    pub short_runs_discarded: u64,
    pub sessions_processed: u64,
    pub sessions_failed: u64,
    pub rows_written: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_secs: u64,
}

/// Totals format for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedTotals {
    pub samples_read: u64,
    pub movements_extracted: u64,
    pub short_runs_discarded: u64,
    pub sessions_processed: u64,
    pub sessions_failed: u64,
    pub rows_written: u64,
    pub last_run_id: Uuid,
    pub last_updated: DateTime<Utc>,
}

/// Read persisted totals from disk.
pub fn load_totals(path: &std::path::Path) -> Result<PersistedTotals, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

/// Thread-safe shared run log.
pub type SharedRunLog = Arc<RunLog>;

/// Create a new shared run log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedRunLog {
    Arc::new(RunLog::with_persistence(path))
}
