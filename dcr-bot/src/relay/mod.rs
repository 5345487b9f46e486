//! Conversation relay
//!
//! Ties the batch store to the transport, converter and archive builder.
//! Conversation lifecycle:
//! - `/start` resets the batch (Idle or Accumulating → Accumulating)
//! - each uploaded file runs intake (→ Accumulating)
//! - `/done` drains and delivers the batch (→ Idle)
//!
//! Handlers never return errors to the caller: every failure becomes a reply
//! in the conversation it belongs to and is remembered for `/health`.

pub mod finalize;
pub mod intake;
pub mod messages;

pub use finalize::FinalizeOutcome;
pub use intake::sanitize_file_name;

use crate::archive::ArchiveBuilder;
use crate::batch::{BatchStore, ConversationId, OutputRef};
use crate::convert::DocumentConverter;
use crate::transport::{InboundEvent, MessageRef, Transport};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Runtime limits and locations used by the handlers
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Uploads declared (or found) larger than this are skipped
    pub max_file_size_bytes: u64,
    /// Scratch root: one sub-directory per file, plus archives
    pub work_dir: PathBuf,
    /// Conversions running longer than this are abandoned
    pub conversion_timeout: Duration,
}

/// Event handlers sharing one batch store
pub struct Relay {
    store: Arc<dyn BatchStore>,
    converter: Arc<dyn DocumentConverter>,
    archiver: Arc<dyn ArchiveBuilder>,
    transport: Arc<dyn Transport>,
    settings: RelaySettings,
    last_error: RwLock<Option<String>>,
}

impl Relay {
    pub fn new(
        store: Arc<dyn BatchStore>,
        converter: Arc<dyn DocumentConverter>,
        archiver: Arc<dyn ArchiveBuilder>,
        transport: Arc<dyn Transport>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            store,
            converter,
            archiver,
            transport,
            settings,
            last_error: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn BatchStore> {
        &self.store
    }

    /// Most recent handler failure, for diagnostics
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Route one inbound event to its handler
    pub async fn dispatch(&self, event: InboundEvent) {
        let conversation = event.conversation();
        debug!(chat_id = %conversation, kind = event.kind(), "Dispatching event");

        match event {
            InboundEvent::StartBatch { conversation } => self.start_batch(conversation).await,
            InboundEvent::FileUploaded { conversation, file } => {
                self.handle_file(conversation, file).await
            }
            InboundEvent::FinalizeBatch { conversation } => self.finalize(conversation).await,
        }
    }

    /// `/start`: empty the batch and explain usage
    pub async fn start_batch(&self, conversation: ConversationId) {
        let discarded = self.store.reset(conversation).await;
        if !discarded.is_empty() {
            info!(
                chat_id = %conversation,
                discarded = discarded.len(),
                "Batch reset, dropping unfinalized outputs"
            );
            self.discard_outputs(&discarded).await;
        } else {
            info!(chat_id = %conversation, "Batch started");
        }

        self.reply(conversation, &messages::usage(self.settings.max_file_size_bytes))
            .await;
    }

    /// Send a reply; delivery failures are logged, never propagated
    async fn reply(&self, conversation: ConversationId, text: &str) {
        if let Err(e) = self.transport.send_text(conversation, text).await {
            warn!(chat_id = %conversation, error = %e, "Failed to send reply");
            self.record_error("reply", &e).await;
        }
    }

    /// Replace a placeholder with `text`, falling back to a fresh message
    async fn finish_reply(
        &self,
        conversation: ConversationId,
        placeholder: Option<MessageRef>,
        text: &str,
    ) {
        if let Some(message) = placeholder {
            match self.transport.edit_text(&message, text).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(chat_id = %conversation, error = %e, "Failed to edit progress message");
                }
            }
        }
        self.reply(conversation, text).await;
    }

    async fn record_error(&self, context: &str, err: &(dyn Display + Sync)) {
        *self.last_error.write().await = Some(format!("{}: {}", context, err));
    }

    /// Delete converted outputs together with their scratch directories
    async fn discard_outputs(&self, outputs: &[OutputRef]) {
        for output in outputs {
            match output.path().parent() {
                Some(dir) if self.is_scratch_dir(dir) => remove_dir_logged(dir).await,
                _ => remove_file_logged(output.path()).await,
            }
        }
    }

    /// Whether `dir` is a per-file scratch directory directly under the work dir
    fn is_scratch_dir(&self, dir: &Path) -> bool {
        dir.parent() == Some(self.settings.work_dir.as_path())
    }
}

/// Best-effort file removal; an already-missing file is not worth a warning
pub(crate) async fn remove_file_logged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

/// Best-effort recursive directory removal
pub(crate) async fn remove_dir_logged(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove directory"),
    }
}
