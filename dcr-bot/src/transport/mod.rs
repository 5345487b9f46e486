//! Messaging transport
//!
//! The relay talks to chat users only through [`Transport`]: send a text,
//! edit it, send a file, and fetch an uploaded file. Inbound traffic arrives
//! as [`InboundEvent`]s decoded from the transport's wire format.

pub mod telegram;
pub mod update;

pub use telegram::TelegramClient;
pub use update::Update;

use crate::batch::ConversationId;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("file is larger than the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        // Bot API URLs embed the token; keep it out of errors and logs
        TransportError::Http(e.without_url())
    }
}

/// Handle of a message the bot sent, used for later edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub conversation: ConversationId,
    pub message_id: i64,
}

/// File attached to an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFile {
    /// Transport handle used to fetch the content
    pub file_id: String,
    /// Name as supplied by the sender (unsanitised)
    pub file_name: String,
    /// Size the sender's client declared; 0 when unknown
    pub declared_size: u64,
}

/// Events the relay reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/start`: open a fresh batch
    StartBatch { conversation: ConversationId },
    /// A document was uploaded
    FileUploaded {
        conversation: ConversationId,
        file: InboundFile,
    },
    /// `/done`: bundle and deliver the batch
    FinalizeBatch { conversation: ConversationId },
}

impl InboundEvent {
    pub fn conversation(&self) -> ConversationId {
        match self {
            InboundEvent::StartBatch { conversation }
            | InboundEvent::FileUploaded { conversation, .. }
            | InboundEvent::FinalizeBatch { conversation } => *conversation,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::StartBatch { .. } => "start",
            InboundEvent::FileUploaded { .. } => "file",
            InboundEvent::FinalizeBatch { .. } => "done",
        }
    }
}

/// Outbound and fetch capabilities of the messaging platform
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a plain-text message
    async fn send_text(&self, conversation: ConversationId, text: &str)
        -> Result<MessageRef, TransportError>;

    /// Replace the text of a message previously sent by the bot
    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<(), TransportError>;

    /// Send `path` as a file attachment named `file_name`
    async fn send_document(
        &self,
        conversation: ConversationId,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TransportError>;

    /// Fetch an uploaded file into `destination`, returning the bytes written
    ///
    /// Fails with [`TransportError::TooLarge`] as soon as the content exceeds
    /// `max_bytes`, whatever size the sender declared.
    async fn download(
        &self,
        file_id: &str,
        destination: &Path,
        max_bytes: u64,
    ) -> Result<u64, TransportError>;
}
