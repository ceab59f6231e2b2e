use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("session already being recorded: {0}")]
    AlreadyRecording(String),
    #[error("session not being recorded: {0}")]
    NotRecording(String),
    #[error("session id cannot name a recording artifact: {0:?}")]
    InvalidSessionId(String),
    #[error("recording artifact I/O failed for {}: {source}", path.display())]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RecordingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ArtifactIo {
            path: path.into(),
            source,
        }
    }
}
