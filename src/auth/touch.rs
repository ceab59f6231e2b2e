//! Detached "last used" bookkeeping.
//!
//! Validators hand a [`Touch`] to the queue and move on. A single worker task,
//! spawned once at startup, drains the queue and writes timestamps to the
//! store. The worker owns its own lifetime: a request that finishes or a client
//! that disconnects cannot cancel an update that was already queued.
//!
//! Delivery is best effort. A full queue drops the update, store errors are
//! logged, and anything still queued at process exit is lost.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::store::CredentialStore;

pub const DEFAULT_TOUCH_QUEUE_SIZE: usize = 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Touch {
    ApiKey { id: Uuid, at: DateTime<Utc> },
    Session { id: Uuid, at: DateTime<Utc> },
}

/// Sending half of the touch worker. Cheap to clone.
#[derive(Clone, Debug)]
pub struct TouchQueue {
    sender: mpsc::Sender<Touch>,
}

impl TouchQueue {
    /// Queue an update without waiting. Returns `false` if it was dropped.
    pub fn submit(&self, touch: Touch) -> bool {
        match self.sender.try_send(touch) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(touch)) => {
                warn!(?touch, "touch queue full, dropping last-used update");
                false
            }
            Err(mpsc::error::TrySendError::Closed(touch)) => {
                warn!(?touch, "touch worker stopped, dropping last-used update");
                false
            }
        }
    }
}

/// Spawn the touch worker on the current runtime and return its queue.
///
/// The worker exits once every [`TouchQueue`] clone has been dropped.
pub fn spawn_touch_worker(
    store: Arc<dyn CredentialStore>,
    capacity: usize,
) -> (TouchQueue, tokio::task::JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel(capacity.max(1));

    let handle = tokio::spawn(async move {
        while let Some(touch) = receiver.recv().await {
            apply(store.as_ref(), touch).await;
        }
        debug!("touch worker stopped");
    });

    (TouchQueue { sender }, handle)
}

async fn apply(store: &dyn CredentialStore, touch: Touch) {
    let result = match touch {
        Touch::ApiKey { id, at } => store.touch_api_key(id, at).await,
        Touch::Session { id, at } => store.touch_session(id, at).await,
    };
    if let Err(err) = result {
        error!(?touch, "failed to record credential use: {err}");
    }
}
