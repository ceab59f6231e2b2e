use pin_project_lite::pin_project;
use std::{
    io,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::{debug, warn};

use super::{RecordingError, SessionRecorder, SessionRecording};

pin_project! {
    /// Transport wrapper that tees outbound bytes into a recording.
    ///
    /// Capture happens after the inner write, not before it: only the prefix
    /// the inner stream reported as written reaches the recording. Bytes
    /// offered while the transport returns `Pending` or an error are not
    /// recorded, and a retried write is never recorded twice. Reads pass
    /// through untouched; keystrokes are not part of the artifact.
    ///
    /// Recording failures never surface to the transport. The stream holds a
    /// weak reference, so once the session is stopped and dropped the stream
    /// keeps working and simply stops capturing.
    pub struct RecordingStream<S> {
        #[pin]
        inner: S,
        recording: Weak<SessionRecording>,
    }
}

impl<S> RecordingStream<S> {
    pub fn new(inner: S, recording: &Arc<SessionRecording>) -> Self {
        Self {
            inner,
            recording: Arc::downgrade(recording),
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl SessionRecorder {
    /// Wrap a transport so its output lands in the live recording for `session_id`.
    ///
    /// # Errors
    /// `NotRecording` if the session has not been started.
    pub fn wrap<S>(&self, session_id: &str, inner: S) -> Result<RecordingStream<S>, RecordingError> {
        let recording = self.get_recorder(session_id)?;
        Ok(RecordingStream::new(inner, &recording))
    }
}

fn capture(recording: &Weak<SessionRecording>, data: &[u8]) {
    if data.is_empty() {
        return;
    }
    let Some(recording) = recording.upgrade() else {
        debug!("recording dropped, skipping capture");
        return;
    };
    match recording.write(data) {
        Ok(()) => {}
        Err(RecordingError::NotRecording(session_id)) => {
            debug!(session_id = %session_id, "recording stopped, skipping capture");
        }
        Err(err) => {
            warn!(session_id = recording.session_id(), "Recording error: {err}");
        }
    }
}

impl<S: AsyncRead> AsyncRead for RecordingStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().inner.poll_read(cx, buf)
    }
}

impl<S: AsyncWrite> AsyncWrite for RecordingStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.project();
        let poll = this.inner.poll_write(cx, buf);
        if let Poll::Ready(Ok(written)) = &poll {
            capture(this.recording, &buf[..*written]);
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const PROMPT: &[u8] = b"\x1b[1;32muser@host\x1b[0m:~$ ";

    fn body(content: &str) -> &str {
        let start = content.find("\n\n").expect("header terminator") + 2;
        let end = content.rfind("\n# End Time:").expect("footer");
        &content[start..end]
    }

    #[tokio::test]
    async fn writes_are_captured_and_reads_are_not() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = SessionRecorder::new(dir.path()).expect("recorder");
        recorder.start_recording("ssh-1").expect("start");

        let (client, server) = tokio::io::duplex(1024);
        let mut stream = recorder.wrap("ssh-1", server).expect("wrap");
        let mut client = client;

        stream
            .write_all(PROMPT)
            .await
            .expect("write");
        client.write_all(b"secret-password\n").await.expect("client write");

        let mut typed = [0u8; 16];
        stream.read_exact(&mut typed).await.expect("read");
        assert_eq!(&typed, b"secret-password\n");

        let mut shown = vec![0u8; PROMPT.len()];
        client.read_exact(&mut shown).await.expect("client read");
        assert_eq!(shown, PROMPT);

        recorder.stop_recording("ssh-1").expect("stop");
        let content =
            fs::read_to_string(recorder.recording_path("ssh-1").expect("path")).expect("artifact");
        assert_eq!(body(&content), "user@host:~$ ");
        assert!(!content.contains("secret-password"));
    }

    #[tokio::test]
    async fn only_accepted_bytes_are_captured() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = SessionRecorder::new(dir.path()).expect("recorder");
        recorder.start_recording("ssh-3").expect("start");

        // The pipe accepts at most 4 bytes before the reader drains it.
        let (mut client, server) = tokio::io::duplex(4);
        let mut stream = recorder.wrap("ssh-3", server).expect("wrap");

        let written = stream.write(b"abcdefgh").await.expect("write");
        assert_eq!(written, 4);
        let mut first = [0u8; 4];
        client.read_exact(&mut first).await.expect("read");
        stream.write_all(b"efgh").await.expect("rest");

        recorder.stop_recording("ssh-3").expect("stop");
        let content =
            fs::read_to_string(recorder.recording_path("ssh-3").expect("path")).expect("artifact");
        assert_eq!(body(&content), "abcdefgh");
    }

    #[tokio::test]
    async fn stream_outlives_recording() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = SessionRecorder::new(dir.path()).expect("recorder");
        recorder.start_recording("ssh-2").expect("start");

        let (mut client, server) = tokio::io::duplex(64);
        let mut stream = recorder.wrap("ssh-2", server).expect("wrap");
        recorder.stop_recording("ssh-2").expect("stop");

        stream.write_all(b"after stop").await.expect("write");
        let mut buf = [0u8; 10];
        client.read_exact(&mut buf).await.expect("read");
        assert_eq!(&buf, b"after stop");
    }

    #[test]
    fn wrap_requires_live_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = SessionRecorder::new(dir.path()).expect("recorder");
        assert!(matches!(
            recorder.wrap("nope", tokio::io::empty()),
            Err(RecordingError::NotRecording(_))
        ));
    }
}
