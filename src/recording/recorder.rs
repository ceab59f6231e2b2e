use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    collections::HashMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
    time::{Duration, Instant},
};
use tracing::{error, info};

use super::{sanitize::strip_ansi, RecordingError};

const ARTIFACT_EXTENSION: &str = "txt";

/// Owns the table of live recordings and the directory their artifacts go to.
///
/// The table lock is taken exclusively by start and stop and shared by lookups.
/// Appends only hold the per-recording lock, so sessions never wait on each other.
#[derive(Debug)]
pub struct SessionRecorder {
    storage_dir: PathBuf,
    sessions: RwLock<HashMap<String, Arc<SessionRecording>>>,
}

/// One live recording. Handed out as `Arc` so writers can append without
/// touching the table.
#[derive(Debug)]
pub struct SessionRecording {
    session_id: String,
    path: PathBuf,
    started_at: DateTime<Utc>,
    started: Instant,
    // `None` once the recording has been stopped.
    file: Mutex<Option<File>>,
}

impl SessionRecorder {
    /// Open (and create, mode 0700) the storage directory.
    ///
    /// # Errors
    /// Returns `ArtifactIo` if the directory cannot be created.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Result<Self, RecordingError> {
        let storage_dir = storage_dir.into();
        create_storage_dir(&storage_dir)?;

        Ok(Self {
            storage_dir,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Where the artifact for `session_id` lives, whether or not it exists yet.
    ///
    /// # Errors
    /// Returns `InvalidSessionId` for ids that would escape the storage directory.
    pub fn recording_path(&self, session_id: &str) -> Result<PathBuf, RecordingError> {
        validate_session_id(session_id)?;
        Ok(self
            .storage_dir
            .join(format!("{session_id}.{ARTIFACT_EXTENSION}")))
    }

    /// Ids of all sessions currently being recorded, sorted.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<String> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Begin recording. Truncates any artifact left by an earlier run of the same id.
    ///
    /// # Errors
    /// `AlreadyRecording` if the id is live, `InvalidSessionId` for unusable ids,
    /// `ArtifactIo` if the artifact cannot be created.
    pub fn start_recording(&self, session_id: &str) -> Result<Arc<SessionRecording>, RecordingError> {
        let path = self.recording_path(session_id)?;

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if sessions.contains_key(session_id) {
            return Err(RecordingError::AlreadyRecording(session_id.to_string()));
        }

        let mut file = File::create(&path).map_err(|e| RecordingError::io(&path, e))?;
        let started_at = Utc::now();
        write!(
            file,
            "# Warden Session Recording\n# Session ID: {session_id}\n# Start Time: {}\n\n",
            started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
        .map_err(|e| RecordingError::io(&path, e))?;

        let recording = Arc::new(SessionRecording {
            session_id: session_id.to_string(),
            path,
            started_at,
            started: Instant::now(),
            file: Mutex::new(Some(file)),
        });
        sessions.insert(session_id.to_string(), recording.clone());

        info!(session_id, "Started recording session");
        Ok(recording)
    }

    /// Sanitize and append `data` to a live recording.
    ///
    /// # Errors
    /// `NotRecording` if the id is not live, `ArtifactIo` if the append fails.
    pub fn write(&self, session_id: &str, data: &[u8]) -> Result<(), RecordingError> {
        self.get_recorder(session_id)?.write(data)
    }

    /// Write the footer, close the artifact and drop the session from the table.
    ///
    /// The footer is written under the table lock, so a restart of the same id
    /// cannot truncate the file under it. The fsync happens after the lock is
    /// released.
    ///
    /// # Errors
    /// `NotRecording` if the id is not live, `ArtifactIo` if the footer cannot be
    /// written. The session is removed either way.
    pub fn stop_recording(&self, session_id: &str) -> Result<(), RecordingError> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let recording = sessions
            .remove(session_id)
            .ok_or_else(|| RecordingError::NotRecording(session_id.to_string()))?;

        let finished = recording.finish();
        drop(sessions);

        info!(session_id, "Stopped recording session");
        if let Err(err) = finished?.sync_all() {
            error!(session_id, "Failed to close recording file: {err}");
        }
        Ok(())
    }

    /// # Errors
    /// `NotRecording` if the id is not live.
    pub fn get_recorder(&self, session_id: &str) -> Result<Arc<SessionRecording>, RecordingError> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| RecordingError::NotRecording(session_id.to_string()))
    }
}

impl SessionRecording {
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Strip ANSI sequences from `data` and append the rest.
    ///
    /// The whole buffer is written under this recording's lock, so concurrent
    /// writes never interleave.
    ///
    /// # Errors
    /// `NotRecording` once the recording has been stopped, `ArtifactIo` on write failure.
    pub fn write(&self, data: &[u8]) -> Result<(), RecordingError> {
        let clean = strip_ansi(data);

        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let file = file
            .as_mut()
            .ok_or_else(|| RecordingError::NotRecording(self.session_id.clone()))?;
        file.write_all(&clean)
            .map_err(|e| RecordingError::io(&self.path, e))
    }

    // Takes the handle and appends the footer. The caller syncs and drops it.
    fn finish(&self) -> Result<File, RecordingError> {
        let Some(mut file) = self.file.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return Err(RecordingError::NotRecording(self.session_id.clone()));
        };

        let ended_at = Utc::now();
        write!(
            file,
            "\n# End Time: {}\n# Duration: {}\n",
            ended_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            format_elapsed(self.started.elapsed())
        )
        .map_err(|e| RecordingError::io(&self.path, e))?;

        Ok(file)
    }
}

fn create_storage_dir(dir: &Path) -> Result<(), RecordingError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir).map_err(|e| RecordingError::io(dir, e))
}

fn validate_session_id(session_id: &str) -> Result<(), RecordingError> {
    let invalid = session_id.is_empty()
        || session_id == "."
        || session_id.contains("..")
        || session_id.contains(['/', '\\'])
        || session_id.chars().any(char::is_control);
    if invalid {
        Err(RecordingError::InvalidSessionId(session_id.to_string()))
    } else {
        Ok(())
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis())
}
