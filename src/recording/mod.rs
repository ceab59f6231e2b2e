//! Session recording.
//!
//! Every live session owns one plain-text artifact, `<storage dir>/<id>.txt`,
//! holding what the session printed with terminal control sequences removed.
//! [`RecordingStream`] plugs a transport into it.

mod error;
mod recorder;
mod sanitize;
mod stream;

pub use error::RecordingError;
pub use recorder::{SessionRecorder, SessionRecording};
pub use sanitize::strip_ansi;
pub use stream::RecordingStream;
