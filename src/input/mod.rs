//! Session input: raw sample types, the CSV log reader and session discovery.

pub mod discovery;
pub mod reader;
pub mod types;

// Re-export commonly used types
pub use discovery::{discover_sessions, user_id_from_dir_name, SessionSource};
pub use reader::{read_samples, read_session_file, ReadError};
pub use types::{Sample, SampleState, SessionKey};
