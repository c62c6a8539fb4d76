//! cursor-fingerprint - mouse-dynamics fingerprints from cursor telemetry.
//!
//! This library turns per-session mouse event logs into one feature vector
//! per session, summarising how a user moves the cursor. The vector can be
//! used as a behavioral biometric signal; comparing or classifying vectors
//! is left to the consumer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      cursor-fingerprint                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │    Input    │──▶│  Segmenter  │──▶│  Features   │         │
//! │  │ (CSV logs)  │   │ (move runs) │   │(per movement│         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │                                             │                │
//! │                                             ▼                │
//! │  ┌─────────────┐                     ┌─────────────┐         │
//! │  │   Ledger    │◀────── batch ──────▶│ Aggregator  │──▶ Sink │
//! │  │  (counts)   │                     │   (mean)    │         │
//! │  └─────────────┘                     └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Feature vector
//!
//! Every session fingerprint holds, in order: `move_time`, `move_len`,
//! `max_speed`, `alpha` and `sigma`, each the mean over all movements of the
//! session and rounded to three decimals.
//!
//! # Example
//!
//! ```
//! use cursor_fingerprint::core::fingerprint_session;
//! use cursor_fingerprint::input::Sample;
//!
//! let samples = vec![
//!     Sample::moving(0.0, 0.0, 0.0),
//!     Sample::moving(1.0, 3.0, 4.0),
//!     Sample::moving(2.0, 6.0, 8.0),
//! ];
//!
//! let fingerprint = fingerprint_session(7, &samples).unwrap();
//! assert_eq!(fingerprint.to_line(false), "2.0,10.0,5.0,0.0,0.0");
//! ```

pub mod batch;
pub mod config;
pub mod core;
pub mod input;
pub mod ledger;
pub mod sink;

// Re-export key types at crate root for convenience
pub use batch::{run_batch, BatchOptions, BatchReport, SessionError};
pub use config::{Config, ConfigError};
pub use crate::core::{
    analyze_session, fingerprint_session, FingerprintError, MovementFeatures, SessionFingerprint,
};
pub use input::{Sample, SampleState, SessionKey};
pub use ledger::{RunLog, RunStats, SharedRunLog};
pub use sink::{FingerprintSink, MemorySink, ScoreFileSink, SinkError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
