//! Session discovery over a directory tree.
//!
//! A directory whose name ends in 1-3 digits (`user7`, `user12`) owns every
//! regular file directly inside it; each file is one session of that user.

use crate::input::types::SessionKey;
use std::path::{Path, PathBuf};

/// A session log located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSource {
    pub key: SessionKey,
    pub path: PathBuf,
}

/// Extract the user id from a directory name ending in 1-3 digits.
pub fn user_id_from_dir_name(name: &str) -> Option<u32> {
    let digits = name
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .count();

    // Longer digit suffixes still match on their last three digits
    let take = digits.min(3);
    if take == 0 {
        return None;
    }
    name[name.len() - take..].parse().ok()
}

/// Walk `root` and collect every session file, sorted by user then session.
pub fn discover_sessions(root: &Path) -> Result<Vec<SessionSource>, std::io::Error> {
    let mut sessions = Vec::new();
    walk(root, &mut sessions)?;
    sessions.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(sessions)
}

fn walk(dir: &Path, sessions: &mut Vec<SessionSource>) -> Result<(), std::io::Error> {
    let dir_name = dir.file_name().and_then(|n| n.to_str());
    let user_id = dir_name.and_then(user_id_from_dir_name);

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            walk(&path, sessions)?;
            continue;
        }
        // Symlinked directories are not descended into
        if file_type.is_symlink() && path.is_dir() {
            continue;
        }

        let (Some(user_id), Some(dir_name)) = (user_id, dir_name) else {
            continue;
        };
        let Some(session_id) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // Skip hidden files such as .DS_Store
        if session_id.starts_with('.') {
            continue;
        }

        sessions.push(SessionSource {
            key: SessionKey::new(user_id, session_id).with_user_dir(dir_name),
            path,
        });
    }

    Ok(())
}
