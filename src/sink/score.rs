//! Score file persistence.
//!
//! Each fingerprint is appended as one header-less CSV row to two files in
//! the score directory: one named after its owner's directory (`user7.csv`)
//! and a global file shared by every user. A row lands in both files or in
//! neither. Appends to the same file are serialized by a per-file lock.

use crate::core::aggregate::SessionFingerprint;
use crate::input::discovery::user_id_from_dir_name;
use crate::input::types::SessionKey;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Errors raised by a fingerprint sink.
#[derive(Debug)]
pub enum SinkError {
    IoError(String),
    CsvError(String),
    LockPoisoned(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::IoError(e) => write!(f, "IO error: {e}"),
            SinkError::CsvError(e) => write!(f, "CSV error: {e}"),
            SinkError::LockPoisoned(p) => write!(f, "lock poisoned for {p}"),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<csv::Error> for SinkError {
    fn from(e: csv::Error) -> Self {
        SinkError::CsvError(e.to_string())
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError::IoError(e.to_string())
    }
}

/// Append-only store of session fingerprints keyed by user.
pub trait FingerprintSink: Send + Sync {
    fn append(&self, key: &SessionKey, fingerprint: &SessionFingerprint) -> Result<(), SinkError>;
}

/// Flat-file sink writing per-user and global score files.
pub struct ScoreFileSink {
    score_dir: PathBuf,
    global_file: String,
    emit_user_id: bool,
    /// One lock per destination file
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ScoreFileSink {
    pub fn new(score_dir: PathBuf, global_file: impl Into<String>, emit_user_id: bool) -> Self {
        Self {
            score_dir,
            global_file: global_file.into(),
            emit_user_id,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the score file for one user.
    pub fn user_path(&self, key: &SessionKey) -> PathBuf {
        self.score_dir.join(format!("{}.csv", key.user_label()))
    }

    /// Path of the score file shared by all users.
    pub fn global_path(&self) -> PathBuf {
        self.score_dir.join(&self.global_file)
    }

    fn lock_for(&self, path: &Path) -> Result<Arc<Mutex<()>>, SinkError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| SinkError::LockPoisoned("lock table".to_string()))?;
        Ok(locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    fn lock_guarded<'l>(
        lock: &'l Mutex<()>,
        path: &Path,
    ) -> Result<std::sync::MutexGuard<'l, ()>, SinkError> {
        lock.lock()
            .map_err(|_| SinkError::LockPoisoned(path.display().to_string()))
    }
}

fn open_append(path: &Path) -> Result<File, SinkError> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

fn write_row(file: &File, row: &[String]) -> Result<(), SinkError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}

impl FingerprintSink for ScoreFileSink {
    /// Append the row to both destinations, or to neither.
    fn append(&self, key: &SessionKey, fingerprint: &SessionFingerprint) -> Result<(), SinkError> {
        std::fs::create_dir_all(&self.score_dir)?;

        let row = fingerprint.to_row(self.emit_user_id);
        let user_path = self.user_path(key);
        let global_path = self.global_path();

        if user_path == global_path {
            let lock = self.lock_for(&user_path)?;
            let _guard = Self::lock_guarded(&lock, &user_path)?;
            return write_row(&open_append(&user_path)?, &row);
        }

        // User file before global file on every path
        let user_lock = self.lock_for(&user_path)?;
        let _user_guard = Self::lock_guarded(&user_lock, &user_path)?;
        let global_lock = self.lock_for(&global_path)?;
        let _global_guard = Self::lock_guarded(&global_lock, &global_path)?;

        let global_file = open_append(&global_path)?;
        let user_file = open_append(&user_path)?;
        let user_len = user_file.metadata()?.len();
        let global_len = global_file.metadata()?.len();

        let written = write_row(&user_file, &row).and_then(|()| write_row(&global_file, &row));
        if let Err(e) = written {
            for (file, len, path) in [
                (&user_file, user_len, &user_path),
                (&global_file, global_len, &global_path),
            ] {
                if let Err(rollback) = file.set_len(len) {
                    tracing::error!(path = %path.display(), "could not roll back partial row: {rollback}");
                }
            }
            return Err(e);
        }

        tracing::debug!(session = %key, path = %user_path.display(), "appended score row");
        Ok(())
    }
}

/// In-memory sink, useful when the caller owns persistence.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<(SessionKey, SessionFingerprint)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored rows in append order.
    pub fn rows(&self) -> Vec<(SessionKey, SessionFingerprint)> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Rows stored for one user, in append order.
    pub fn rows_for_user(&self, user_id: u32) -> Vec<SessionFingerprint> {
        self.rows()
            .into_iter()
            .filter(|(key, _)| key.user_id == user_id)
            .map(|(_, fp)| fp)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FingerprintSink for MemorySink {
    fn append(&self, key: &SessionKey, fingerprint: &SessionFingerprint) -> Result<(), SinkError> {
        self.rows
            .lock()
            .map_err(|_| SinkError::LockPoisoned("memory sink".to_string()))?
            .push((key.clone(), fingerprint.clone()));
        Ok(())
    }
}

/// Read a per-user score file back into fingerprints.
pub fn read_score_file(path: &Path, user_id: u32) -> Result<Vec<SessionFingerprint>, SinkError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut fingerprints = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fields: Vec<&str> = record.iter().collect();
        match SessionFingerprint::from_row(user_id, &fields) {
            Some(fp) => fingerprints.push(fp),
            None => tracing::warn!(path = %path.display(), "skipping malformed score row"),
        }
    }
    Ok(fingerprints)
}

/// Collect every per-user score file (`user<ID>.csv`) in a directory.
pub fn collect_user_scores(score_dir: &Path) -> Result<Vec<SessionFingerprint>, SinkError> {
    let mut files: Vec<(u32, PathBuf)> = std::fs::read_dir(score_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
        .filter_map(|p| {
            let stem = p.file_stem()?.to_str()?;
            // Only user<ID>.csv files are per-user score files
            if !stem.starts_with("user") {
                return None;
            }
            let user_id = user_id_from_dir_name(stem)?;
            Some((user_id, p))
        })
        .collect();
    files.sort();

    let mut all = Vec::new();
    for (user_id, path) in files {
        all.extend(read_score_file(&path, user_id)?);
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::aggregate;
    use crate::core::features::MovementFeatures;

    fn fingerprint(user_id: u32, move_time: f64) -> SessionFingerprint {
        let features = MovementFeatures {
            move_time,
            move_len: 10.0,
            max_speed: 5.0,
            alpha: 0.0,
            sigma: 0.5,
            user_id,
        };
        aggregate(user_id, &[features]).unwrap()
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("cf-sink-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_score_file_rows() {
        let dir = scratch_dir();
        let sink = ScoreFileSink::new(dir.clone(), "score.csv", false);

        sink.append(&SessionKey::new(7, "s1"), &fingerprint(7, 1.0)).unwrap();
        sink.append(&SessionKey::new(7, "s2"), &fingerprint(7, 2.0)).unwrap();
        sink.append(&SessionKey::new(9, "s1"), &fingerprint(9, 3.0)).unwrap();

        let user7 = std::fs::read_to_string(dir.join("user7.csv")).unwrap();
        assert_eq!(user7, "1.0,10.0,5.0,0.0,0.5\n2.0,10.0,5.0,0.0,0.5\n");

        let global = std::fs::read_to_string(dir.join("score.csv")).unwrap();
        assert_eq!(global.lines().count(), 3);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unwritable_global_file_leaves_user_file_untouched() {
        let dir = scratch_dir();
        std::fs::create_dir_all(dir.join("score.csv")).unwrap();
        let sink = ScoreFileSink::new(dir.clone(), "score.csv", false);

        let result = sink.append(&SessionKey::new(7, "s1"), &fingerprint(7, 1.0));
        assert!(matches!(result, Err(SinkError::IoError(_))));

        assert!(!dir.join("user7.csv").exists());
        assert!(collect_user_scores(&dir).unwrap().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_padded_user_label_names_the_file() {
        let dir = scratch_dir();
        let sink = ScoreFileSink::new(dir.clone(), "score.csv", false);
        let key = SessionKey::new(7, "s1").with_user_dir("user007");
        sink.append(&key, &fingerprint(7, 1.0)).unwrap();

        assert!(dir.join("user007.csv").exists());
        let all = collect_user_scores(&dir).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_id, 7);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_user_id_column() {
        let dir = scratch_dir();
        let sink = ScoreFileSink::new(dir.clone(), "score.csv", true);
        sink.append(&SessionKey::new(4, "s1"), &fingerprint(4, 1.0)).unwrap();

        let global = std::fs::read_to_string(dir.join("score.csv")).unwrap();
        assert_eq!(global, "1.0,10.0,5.0,0.0,0.5,4\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let dir = scratch_dir();
        let sink = Arc::new(ScoreFileSink::new(dir.clone(), "score.csv", false));

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let sink = Arc::clone(&sink);
                scope.spawn(move || {
                    for i in 0..25 {
                        let key = SessionKey::new(1, format!("w{worker}-{i}"));
                        sink.append(&key, &fingerprint(1, i as f64)).unwrap();
                    }
                });
            }
        });

        let rows = read_score_file(&dir.join("user1.csv"), 1).unwrap();
        assert_eq!(rows.len(), 100);
        let global = std::fs::read_to_string(dir.join("score.csv")).unwrap();
        assert!(global.lines().all(|l| l.split(',').count() == 5));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_collect_user_scores_skips_global_file() {
        let dir = scratch_dir();
        let sink = ScoreFileSink::new(dir.clone(), "score.csv", false);
        sink.append(&SessionKey::new(2, "a"), &fingerprint(2, 1.0)).unwrap();
        sink.append(&SessionKey::new(12, "b"), &fingerprint(12, 2.0)).unwrap();

        let all = collect_user_scores(&dir).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, 2);
        assert_eq!(all[1].user_id, 12);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.append(&SessionKey::new(1, "a"), &fingerprint(1, 1.0)).unwrap();
        sink.append(&SessionKey::new(2, "b"), &fingerprint(2, 2.0)).unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.rows_for_user(2)[0].move_time, 2.0);
    }
}
