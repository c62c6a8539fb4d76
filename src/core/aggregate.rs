//! Session-level aggregation of movement features.

use crate::core::features::{round_to_precision, MovementFeatures};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Column names of a fingerprint row, in order.
pub const FEATURE_COLUMNS: [&str; 5] = ["move_time", "move_len", "max_speed", "alpha", "sigma"];

/// Mean movement features of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFingerprint {
    pub user_id: u32,
    pub movement_count: usize,
    pub move_time: f64,
    pub move_len: f64,
    pub max_speed: f64,
    pub alpha: f64,
    pub sigma: f64,
}

impl SessionFingerprint {
    /// Feature values in [`FEATURE_COLUMNS`] order.
    pub fn values(&self) -> [f64; 5] {
        [
            self.move_time,
            self.move_len,
            self.max_speed,
            self.alpha,
            self.sigma,
        ]
    }

    /// Row fields for persistence, optionally followed by the user id.
    pub fn to_row(&self, emit_user_id: bool) -> Vec<String> {
        let mut row: Vec<String> = self.values().iter().map(|&v| format_value(v)).collect();
        if emit_user_id {
            row.push(self.user_id.to_string());
        }
        row
    }

    /// Row as a single comma-separated line (no newline).
    pub fn to_line(&self, emit_user_id: bool) -> String {
        self.to_row(emit_user_id).join(",")
    }

    /// Rebuild a fingerprint from persisted row fields.
    ///
    /// The movement count is not persisted and comes back as zero.
    pub fn from_row(user_id: u32, fields: &[&str]) -> Option<Self> {
        if fields.len() < FEATURE_COLUMNS.len() {
            return None;
        }
        let mut values = [0.0; 5];
        for (slot, field) in values.iter_mut().zip(fields) {
            *slot = field.trim().parse().ok()?;
        }
        Some(Self {
            user_id,
            movement_count: 0,
            move_time: values[0],
            move_len: values[1],
            max_speed: values[2],
            alpha: values[3],
            sigma: values[4],
        })
    }
}

/// Aggregation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    /// The session produced no valid movement
    NoMovements,
}

impl std::fmt::Display for FingerprintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintError::NoMovements => {
                write!(f, "no fingerprint available: session has no valid movements")
            }
        }
    }
}

impl std::error::Error for FingerprintError {}

/// Column-wise mean of a session's movement features.
pub fn aggregate(
    user_id: u32,
    features: &[MovementFeatures],
) -> Result<SessionFingerprint, FingerprintError> {
    if features.is_empty() {
        return Err(FingerprintError::NoMovements);
    }

    let column_mean =
        |pick: fn(&MovementFeatures) -> f64| round_to_precision(features.iter().map(pick).mean());

    Ok(SessionFingerprint {
        user_id,
        movement_count: features.len(),
        move_time: column_mean(|f| f.move_time),
        move_len: column_mean(|f| f.move_len),
        max_speed: column_mean(|f| f.max_speed),
        alpha: column_mean(|f| f.alpha),
        sigma: column_mean(|f| f.sigma),
    })
}

/// Format a rounded value the way score files store it: shortest
/// round-trip form, always with a decimal part.
pub fn format_value(value: f64) -> String {
    // Avoid writing "-0.0"
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:?}")
}
