//! Movement segmentation.
//!
//! A movement is a maximal run of consecutive move-labeled samples, where
//! "consecutive" means adjacent rows in the log. Any other state interrupts
//! the run; time gaps do not.

use crate::input::types::Sample;

/// Fewest samples a movement needs before features can be computed.
pub const MIN_MOVEMENT_POINTS: usize = 3;

/// Inclusive row range of one maximal run of move samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRun {
    pub start: usize,
    pub end: usize,
}

impl MoveRun {
    /// Number of samples in the run.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// A run always holds at least one sample.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the run is long enough to become a movement.
    pub fn is_movement(&self) -> bool {
        self.len() >= MIN_MOVEMENT_POINTS
    }
}

/// A validated movement borrowing its samples from the session log.
#[derive(Debug, Clone, Copy)]
pub struct Movement<'a> {
    pub run: MoveRun,
    pub samples: &'a [Sample],
}

impl<'a> Movement<'a> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Find every maximal run of move samples, short ones included.
pub fn move_runs(samples: &[Sample]) -> Vec<MoveRun> {
    let move_idx: Vec<usize> = samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.state.is_move())
        .map(|(i, _)| i)
        .collect();

    let Some(&first) = move_idx.first() else {
        return Vec::new();
    };

    let mut runs = Vec::new();
    let mut start = first;
    for pair in move_idx.windows(2) {
        if pair[1] - pair[0] > 1 {
            runs.push(MoveRun {
                start,
                end: pair[0],
            });
            start = pair[1];
        }
    }

    // The last run is closed by the end of the index list
    if let Some(&last) = move_idx.last() {
        runs.push(MoveRun { start, end: last });
    }

    runs
}

/// Split a session into movements, dropping runs shorter than
/// [`MIN_MOVEMENT_POINTS`].
pub fn segment(samples: &[Sample]) -> Vec<Movement<'_>> {
    move_runs(samples)
        .into_iter()
        .filter(MoveRun::is_movement)
        .map(|run| Movement {
            run,
            samples: &samples[run.start..=run.end],
        })
        .collect()
}
