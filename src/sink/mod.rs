//! Fingerprint persistence.

pub mod score;

// Re-export commonly used types
pub use score::{
    collect_user_scores, read_score_file, FingerprintSink, MemorySink, ScoreFileSink, SinkError,
};
