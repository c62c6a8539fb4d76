//! Raw cursor samples and session identity.
//!
//! A session log is an ordered list of [`Sample`]s. Order is the row order of
//! the log; timestamps may tie but never decrease.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cursor state label attached to every sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleState {
    /// Cursor movement with no button held
    Move,
    /// Movement with a button held
    Drag,
    /// Button press
    Pressed,
    /// Button release
    Released,
    /// Wheel scrolled up
    Up,
    /// Wheel scrolled down
    Down,
    /// Any label we do not recognise
    Other(String),
}

impl SampleState {
    /// Parse a state label. Matching is case-insensitive and ignores
    /// surrounding whitespace.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "move" => SampleState::Move,
            "drag" => SampleState::Drag,
            "pressed" => SampleState::Pressed,
            "released" => SampleState::Released,
            "up" => SampleState::Up,
            "down" => SampleState::Down,
            _ => SampleState::Other(trimmed.to_string()),
        }
    }

    /// Whether the sample takes part in movement segmentation.
    pub fn is_move(&self) -> bool {
        matches!(self, SampleState::Move)
    }
}

/// One raw cursor event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds, non-decreasing within a session
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub state: SampleState,
}

impl Sample {
    pub fn new(timestamp: f64, x: f64, y: f64, state: SampleState) -> Self {
        Self {
            timestamp,
            x,
            y,
            state,
        }
    }

    /// Shorthand for a move-labeled sample.
    pub fn moving(timestamp: f64, x: f64, y: f64) -> Self {
        Self::new(timestamp, x, y, SampleState::Move)
    }

    /// Screen position as an `(x, y)` pair.
    pub fn point(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Identifies one session of one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: u32,
    pub session_id: String,
    /// Name of the directory the session was found in (`user7`, `user007`)
    pub user_dir: String,
}

impl SessionKey {
    pub fn new(user_id: u32, session_id: impl Into<String>) -> Self {
        Self {
            user_id,
            session_id: session_id.into(),
            user_dir: format!("user{user_id}"),
        }
    }

    /// Keep the on-disk directory name as the user label.
    pub fn with_user_dir(mut self, user_dir: impl Into<String>) -> Self {
        self.user_dir = user_dir.into();
        self
    }

    /// Label used for the per-user score destination.
    pub fn user_label(&self) -> &str {
        &self.user_dir
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_dir, self.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_label_parsing() {
        assert_eq!(SampleState::from_label("Move"), SampleState::Move);
        assert_eq!(SampleState::from_label(" move "), SampleState::Move);
        assert_eq!(SampleState::from_label("Drag"), SampleState::Drag);
        assert_eq!(
            SampleState::from_label("Wiggle"),
            SampleState::Other("Wiggle".to_string())
        );
    }

    #[test]
    fn test_only_move_segments() {
        assert!(SampleState::Move.is_move());
        assert!(!SampleState::Drag.is_move());
        assert!(!SampleState::Other("move-ish".to_string()).is_move());
    }

    #[test]
    fn test_session_key_display() {
        let key = SessionKey::new(7, "session_0041905381");
        assert_eq!(key.to_string(), "user7/session_0041905381");
        assert_eq!(key.user_label(), "user7");
    }

    #[test]
    fn test_session_key_keeps_directory_name() {
        let key = SessionKey::new(7, "s1").with_user_dir("user007");
        assert_eq!(key.user_id, 7);
        assert_eq!(key.user_label(), "user007");
        assert_eq!(key.to_string(), "user007/s1");
    }
}
