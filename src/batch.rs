//! Batch processing of many sessions.
//!
//! Sessions are independent, so they are handed to a pool of worker threads
//! over a channel. A failing session is reported and the batch moves on; it
//! never aborts the run or touches rows already written for other sessions.

use crate::core::aggregate::{FingerprintError, SessionFingerprint};
use crate::core::pipeline::analyze_session;
use crate::input::discovery::SessionSource;
use crate::input::reader::{read_session_file, ReadError};
use crate::input::types::SessionKey;
use crate::ledger::RunLog;
use crate::sink::{FingerprintSink, SinkError};
use crossbeam_channel::{bounded, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why a session produced no row.
#[derive(Debug)]
pub enum SessionErrorKind {
    /// The log could not be read or is malformed
    Read(ReadError),
    /// No valid movement in the session
    NoFingerprint(FingerprintError),
    /// The row could not be persisted
    Sink(SinkError),
}

/// A per-session failure, tagged with the offending session.
#[derive(Debug)]
pub struct SessionError {
    pub key: SessionKey,
    pub kind: SessionErrorKind,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SessionErrorKind::Read(e) => write!(f, "session {}: malformed input: {e}", self.key),
            SessionErrorKind::NoFingerprint(e) => write!(f, "session {}: {e}", self.key),
            SessionErrorKind::Sink(e) => write!(f, "session {}: write failed: {e}", self.key),
        }
    }
}

impl std::error::Error for SessionError {}

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker threads (at least one is always started)
    pub workers: usize,
    /// Cleared to stop dispatching further sessions
    pub running: Arc<AtomicBool>,
}

impl BatchOptions {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            running: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Outcome of a batch run, sorted by session.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<(SessionKey, SessionFingerprint)>,
    pub failed: Vec<SessionError>,
    /// Sessions never dispatched because the run was stopped
    pub skipped: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped
    }
}

/// Read, fingerprint and persist one session.
pub fn process_session(
    source: &SessionSource,
    sink: &dyn FingerprintSink,
    log: &RunLog,
) -> Result<SessionFingerprint, SessionError> {
    let fail = |kind| SessionError {
        key: source.key.clone(),
        kind,
    };

    let samples = read_session_file(&source.path).map_err(|e| fail(SessionErrorKind::Read(e)))?;
    log.record_samples(samples.len() as u64);

    let analysis = analyze_session(source.key.user_id, &samples);
    log.record_movements(analysis.movements.len() as u64);
    log.record_short_runs(analysis.short_runs as u64);
    tracing::debug!(
        session = %source.key,
        samples = analysis.sample_count,
        runs = analysis.run_count,
        movements = analysis.movements.len(),
        "segmented session"
    );

    let fingerprint = analysis
        .fingerprint()
        .map_err(|e| fail(SessionErrorKind::NoFingerprint(e)))?;

    sink.append(&source.key, &fingerprint)
        .map_err(|e| fail(SessionErrorKind::Sink(e)))?;
    log.record_row_written();

    Ok(fingerprint)
}

/// Process every session on a pool of worker threads.
pub fn run_batch(
    sessions: Vec<SessionSource>,
    sink: &dyn FingerprintSink,
    log: &RunLog,
    options: &BatchOptions,
) -> BatchReport {
    let workers = options.workers.max(1);
    let total = sessions.len();

    let (job_tx, job_rx) = bounded::<SessionSource>(workers * 2);
    let (result_tx, result_rx) = unbounded();

    let mut dispatched = 0;
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for source in job_rx.iter() {
                    let outcome = process_session(&source, sink, log);
                    if result_tx.send((source.key, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        for source in sessions {
            if !options.running.load(Ordering::SeqCst) {
                tracing::warn!("stop requested, not dispatching remaining sessions");
                break;
            }
            if job_tx.send(source).is_err() {
                break;
            }
            dispatched += 1;
        }

        // Closing the job channel lets idle workers exit
        drop(job_tx);
    });

    let mut report = BatchReport {
        skipped: total - dispatched,
        ..BatchReport::default()
    };

    for (key, outcome) in result_rx.iter() {
        match outcome {
            Ok(fingerprint) => {
                log.record_session_processed();
                tracing::info!(session = %key, movements = fingerprint.movement_count, "fingerprint written");
                report.succeeded.push((key, fingerprint));
            }
            Err(e) => {
                log.record_session_failed();
                tracing::warn!("{e}");
                report.failed.push(e);
            }
        }
    }

    report.succeeded.sort_by(|a, b| a.0.cmp(&b.0));
    report.failed.sort_by(|a, b| a.key.cmp(&b.key));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::path::PathBuf;

    struct Scratch(PathBuf);

    impl Scratch {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("cf-batch-{}-root", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn session(&self, user_id: u32, name: &str, body: &str) -> SessionSource {
            let path = self.0.join(name);
            std::fs::write(&path, body).unwrap();
            SessionSource {
                key: SessionKey::new(user_id, name),
                path,
            }
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    const STRAIGHT: &str = "timestamp,x,y,state\n0,0,0,Move\n1,3,4,Move\n2,6,8,Move\n";

    #[test]
    fn test_process_session_writes_row() {
        let scratch = Scratch::new();
        let source = scratch.session(3, "s1", STRAIGHT);
        let sink = MemorySink::new();
        let log = RunLog::new();

        let fp = process_session(&source, &sink, &log).unwrap();
        assert_eq!(fp.values(), [2.0, 10.0, 5.0, 0.0, 0.0]);
        assert_eq!(sink.rows_for_user(3).len(), 1);
        assert_eq!(log.stats().samples_read, 3);
        assert_eq!(log.stats().rows_written, 1);
    }

    #[test]
    fn test_failures_are_isolated() {
        let scratch = Scratch::new();
        let sessions = vec![
            scratch.session(1, "good", STRAIGHT),
            scratch.session(1, "clicks", "timestamp,x,y,state\n0,0,0,Pressed\n"),
            scratch.session(2, "broken", "timestamp,x,state\n0,0,Move\n"),
            scratch.session(2, "also_good", STRAIGHT),
        ];
        let sink = MemorySink::new();
        let log = RunLog::new();

        let report = run_batch(sessions, &sink, &log, &BatchOptions::new(3));
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(sink.len(), 2);

        let clicks = report
            .failed
            .iter()
            .find(|e| e.key.session_id == "clicks")
            .unwrap();
        assert!(matches!(
            clicks.kind,
            SessionErrorKind::NoFingerprint(FingerprintError::NoMovements)
        ));

        let broken = report
            .failed
            .iter()
            .find(|e| e.key.session_id == "broken")
            .unwrap();
        assert!(broken.to_string().contains("user2/broken"));

        let stats = log.stats();
        assert_eq!(stats.sessions_processed, 2);
        assert_eq!(stats.sessions_failed, 2);
    }

    #[test]
    fn test_stopped_run_skips_everything() {
        let scratch = Scratch::new();
        let sessions = vec![
            scratch.session(1, "a", STRAIGHT),
            scratch.session(1, "b", STRAIGHT),
        ];
        let options = BatchOptions::new(2);
        options.running.store(false, Ordering::SeqCst);

        let report = run_batch(sessions, &MemorySink::new(), &RunLog::new(), &options);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.total(), 2);
        assert!(report.succeeded.is_empty());
    }

    #[test]
    fn test_report_sorted_by_session() {
        let scratch = Scratch::new();
        let sessions: Vec<SessionSource> = (0..12)
            .map(|i| scratch.session(i % 3, &format!("s{i:02}"), STRAIGHT))
            .collect();

        let report = run_batch(sessions, &MemorySink::new(), &RunLog::new(), &BatchOptions::new(4));
        let keys: Vec<&SessionKey> = report.succeeded.iter().map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 12);
    }
}
