//! Core fingerprint extraction.
//!
//! This module contains:
//! - Segmentation of a session log into movements
//! - Per-movement feature extraction
//! - Aggregation of movement features into a session fingerprint

pub mod aggregate;
pub mod features;
pub mod pipeline;
pub mod segmentation;

// Re-export commonly used types
pub use aggregate::{aggregate, FingerprintError, SessionFingerprint, FEATURE_COLUMNS};
pub use features::{distance, extract, slope_angle, MovementFeatures, MIN_STEP_TIME, PRECISION};
pub use pipeline::{analyze_session, fingerprint_session, SessionAnalysis};
pub use segmentation::{move_runs, segment, MoveRun, Movement, MIN_MOVEMENT_POINTS};
