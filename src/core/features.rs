//! Per-movement kinematic and geometric features.
//!
//! Every degenerate geometry case has a defined fallback instead of an error:
//!
//! - zero time between two samples: the step time is taken as
//!   [`MIN_STEP_TIME`] seconds
//! - start and end of the reference line coincide: perpendicular distance
//!   becomes plain distance to that point
//! - vertical direction (no x change): the slope angle is ±90° with the
//!   sign of the y change

use crate::core::segmentation::{Movement, MIN_MOVEMENT_POINTS};
use serde::{Deserialize, Serialize};

/// Step time used in place of a zero time delta (seconds).
pub const MIN_STEP_TIME: f64 = 0.001;

/// Decimal places kept on every exported scalar.
pub const PRECISION: i32 = 3;

/// Features of a single movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementFeatures {
    /// Time from first to last sample (seconds)
    pub move_time: f64,
    /// Path length along all samples
    pub move_len: f64,
    /// Highest step speed
    pub max_speed: f64,
    /// Early direction minus overall direction (degrees, signed)
    pub alpha: f64,
    /// Mean squared deviation of interior samples from the start-end line
    pub sigma: f64,
    /// Owner of the session this movement came from
    pub user_id: u32,
}

impl MovementFeatures {
    /// Feature values in canonical column order.
    pub fn values(&self) -> [f64; 5] {
        [
            self.move_time,
            self.move_len,
            self.max_speed,
            self.alpha,
            self.sigma,
        ]
    }

    fn is_finite(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
    }
}

/// Round to [`PRECISION`] decimal places.
pub fn round_to_precision(value: f64) -> f64 {
    let scale = 10f64.powi(PRECISION);
    (value * scale).round() / scale
}

/// Perpendicular distance from `p0` to the infinite line through `p1` and
/// `p2`. Falls back to the distance from `p0` to `p1` when the two line
/// points coincide.
pub fn distance(p1: (f64, f64), p2: (f64, f64), p0: (f64, f64)) -> f64 {
    let (x1, y1) = p1;
    let (x2, y2) = p2;
    let (x0, y0) = p0;

    let dx = x2 - x1;
    let dy = y2 - y1;
    let norm = dy.hypot(dx);
    if norm == 0.0 {
        return (x0 - x1).hypot(y0 - y1);
    }

    (dy * x0 - dx * y0 + x2 * y1 - y2 * x1).abs() / norm
}

/// Slope angle in degrees of the line from `origin` through `to`.
///
/// The result lies in [-90, 90]. A vertical line yields ±90 with the sign of
/// the y change.
pub fn slope_angle(origin: (f64, f64), to: (f64, f64)) -> f64 {
    let dx = to.0 - origin.0;
    let dy = to.1 - origin.1;
    if dx == 0.0 {
        return 90f64.copysign(dy);
    }
    (dy / dx).atan().to_degrees()
}

/// Speed over one step, substituting [`MIN_STEP_TIME`] for a zero delta.
pub fn step_speed(length: f64, elapsed: f64) -> f64 {
    if elapsed == 0.0 {
        length / MIN_STEP_TIME
    } else {
        length / elapsed
    }
}

/// Compute the features of one movement.
///
/// Returns `None` for movements shorter than [`MIN_MOVEMENT_POINTS`] and for
/// movements whose features are not finite.
pub fn extract(movement: &Movement<'_>, user_id: u32) -> Option<MovementFeatures> {
    let samples = movement.samples;
    let n = samples.len();
    if n < MIN_MOVEMENT_POINTS {
        return None;
    }

    let first = &samples[0];
    let last = &samples[n - 1];

    let mut move_len = 0.0;
    let mut max_speed = 0.0f64;
    for pair in samples.windows(2) {
        let step_len = (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y);
        let step_time = pair[1].timestamp - pair[0].timestamp;
        max_speed = max_speed.max(step_speed(step_len, step_time));
        move_len += step_len;
    }

    let interior = &samples[1..n - 1];
    let sigma = interior
        .iter()
        .map(|s| distance(first.point(), last.point(), s.point()).powi(2))
        .sum::<f64>()
        / interior.len() as f64;

    let early_angle = slope_angle(first.point(), samples[2].point());
    let overall_angle = slope_angle(first.point(), last.point());
    let alpha = early_angle - overall_angle;

    let features = MovementFeatures {
        move_time: round_to_precision(last.timestamp - first.timestamp),
        move_len: round_to_precision(move_len),
        max_speed: round_to_precision(max_speed),
        alpha: round_to_precision(alpha),
        sigma: round_to_precision(sigma),
        user_id,
    };

    features.is_finite().then_some(features)
}
