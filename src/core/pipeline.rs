//! Per-session pipeline: samples to movements to features to fingerprint.

use crate::core::aggregate::{aggregate, FingerprintError, SessionFingerprint};
use crate::core::features::{extract, MovementFeatures};
use crate::core::segmentation::{move_runs, segment};
use crate::input::types::Sample;
use serde::{Deserialize, Serialize};

/// Everything extracted from one session before aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAnalysis {
    pub user_id: u32,
    /// Samples in the log
    pub sample_count: usize,
    /// Maximal move runs of any length
    pub run_count: usize,
    /// Runs too short to become movements
    pub short_runs: usize,
    /// Movements whose features were undefined
    pub undefined_movements: usize,
    /// Features of every valid movement, in log order
    pub movements: Vec<MovementFeatures>,
}

impl SessionAnalysis {
    /// Reduce the movement table to the session fingerprint.
    pub fn fingerprint(&self) -> Result<SessionFingerprint, FingerprintError> {
        aggregate(self.user_id, &self.movements)
    }
}

/// Segment a session and extract features for every movement.
pub fn analyze_session(user_id: u32, samples: &[Sample]) -> SessionAnalysis {
    let run_count = move_runs(samples).len();
    let segments = segment(samples);
    let short_runs = run_count - segments.len();

    let movements: Vec<MovementFeatures> = segments
        .iter()
        .filter_map(|m| extract(m, user_id))
        .collect();
    let undefined_movements = segments.len() - movements.len();

    SessionAnalysis {
        user_id,
        sample_count: samples.len(),
        run_count,
        short_runs,
        undefined_movements,
        movements,
    }
}

/// Fingerprint a session in one step.
pub fn fingerprint_session(
    user_id: u32,
    samples: &[Sample],
) -> Result<SessionFingerprint, FingerprintError> {
    analyze_session(user_id, samples).fingerprint()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::types::SampleState;

    fn click(t: f64) -> Sample {
        Sample::new(t, 0.0, 0.0, SampleState::Pressed)
    }

    #[test]
    fn test_single_movement_session() {
        let samples = vec![
            Sample::moving(0.0, 0.0, 0.0),
            Sample::moving(1.0, 3.0, 4.0),
            Sample::moving(2.0, 6.0, 8.0),
        ];
        let fp = fingerprint_session(4, &samples).unwrap();
        assert_eq!(fp.movement_count, 1);
        assert_eq!(fp.values(), [2.0, 10.0, 5.0, 0.0, 0.0]);
        assert_eq!(fp.user_id, 4);
    }

    #[test]
    fn test_interrupted_session_averages_two_movements() {
        let samples = vec![
            Sample::moving(0.0, 0.0, 0.0),
            Sample::moving(1.0, 3.0, 4.0),
            Sample::moving(2.0, 6.0, 8.0),
            click(2.5),
            Sample::moving(3.0, 0.0, 0.0),
            Sample::moving(3.5, 0.0, 1.0),
            Sample::moving(4.0, 0.0, 2.0),
            Sample::moving(5.0, 0.0, 3.0),
        ];
        let analysis = analyze_session(1, &samples);
        assert_eq!(analysis.run_count, 2);
        assert_eq!(analysis.movements.len(), 2);
        assert_eq!(analysis.movements[1].move_time, 2.0);
        assert_eq!(analysis.movements[1].move_len, 3.0);
        assert_eq!(analysis.movements[1].max_speed, 2.0);

        let fp = analysis.fingerprint().unwrap();
        assert_eq!(fp.move_time, 2.0);
        assert_eq!(fp.move_len, 6.5);
        assert_eq!(fp.max_speed, 3.5);
    }

    #[test]
    fn test_no_moves_means_no_fingerprint() {
        let samples = vec![click(0.0), click(1.0)];
        assert_eq!(
            fingerprint_session(1, &samples),
            Err(FingerprintError::NoMovements)
        );
    }

    #[test]
    fn test_only_short_runs_means_no_fingerprint() {
        let samples = vec![
            Sample::moving(0.0, 0.0, 0.0),
            Sample::moving(0.1, 1.0, 0.0),
            click(0.2),
            Sample::moving(0.3, 2.0, 0.0),
        ];
        let analysis = analyze_session(1, &samples);
        assert_eq!(analysis.run_count, 2);
        assert_eq!(analysis.short_runs, 2);
        assert_eq!(analysis.fingerprint(), Err(FingerprintError::NoMovements));
    }

    #[test]
    fn test_repeat_runs_match() {
        let samples: Vec<Sample> = (0..50)
            .map(|i| {
                let t = i as f64 * 0.02;
                if i % 11 == 10 {
                    click(t)
                } else {
                    Sample::moving(t, (i * i % 17) as f64, (i * 3 % 13) as f64)
                }
            })
            .collect();
        let first = fingerprint_session(2, &samples).unwrap();
        let second = fingerprint_session(2, &samples).unwrap();
        assert_eq!(first.to_line(false), second.to_line(false));
    }
}
