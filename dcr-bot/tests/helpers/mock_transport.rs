//! Recording transport
//!
//! Texts are kept per message id so an edit replaces the original, which
//! makes "one reply per event" directly checkable. Archives are opened at
//! send time because the relay deletes them right after delivery.

use async_trait::async_trait;
use dcr_bot::batch::ConversationId;
use dcr_bot::transport::{MessageRef, Transport, TransportError};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

/// File id prefix for uploads whose real size exceeds any limit
pub const OVERSIZED_PREFIX: &str = "file-liar";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub conversation: ConversationId,
    pub message_id: i64,
    pub text: String,
    pub edits: usize,
}

#[derive(Debug, Clone)]
pub struct SentDocument {
    pub conversation: ConversationId,
    pub file_name: String,
    /// (entry name, entry bytes) in archive order
    pub entries: Vec<(String, Vec<u8>)>,
}

impl SentDocument {
    pub fn entry_names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }
}

#[derive(Debug, Default)]
pub struct MockTransport {
    next_message_id: AtomicI64,
    messages: Mutex<Vec<SentMessage>>,
    documents: Mutex<Vec<SentDocument>>,
    downloads: Mutex<Vec<String>>,
    fail_send_document: AtomicBool,
    fail_edits: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_send_document(&self, fail: bool) {
        self.fail_send_document.store(fail, Ordering::SeqCst);
    }

    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Final text of every message sent to `chat`, in send order
    pub fn texts(&self, chat: i64) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation == ConversationId(chat))
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn last_text(&self, chat: i64) -> Option<String> {
        self.texts(chat).pop()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn documents(&self, chat: i64) -> Vec<SentDocument> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.conversation == ConversationId(chat))
            .cloned()
            .collect()
    }

    /// File ids fetched so far
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

fn read_archive(path: &Path) -> Vec<(String, Vec<u8>)> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).unwrap();
            (entry.name().to_string(), bytes)
        })
        .collect()
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<MessageRef, TransportError> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.messages.lock().unwrap().push(SentMessage {
            conversation,
            message_id,
            text: text.to_string(),
            edits: 0,
        });
        Ok(MessageRef {
            conversation,
            message_id,
        })
    }

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<(), TransportError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(TransportError::Api(
                "editMessageText failed (400): Bad Request: message to edit not found".to_string(),
            ));
        }
        let mut messages = self.messages.lock().unwrap();
        let sent = messages
            .iter_mut()
            .find(|m| m.message_id == message.message_id)
            .ok_or_else(|| TransportError::Api("unknown message".to_string()))?;
        sent.text = text.to_string();
        sent.edits += 1;
        Ok(())
    }

    async fn send_document(
        &self,
        conversation: ConversationId,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TransportError> {
        if self.fail_send_document.load(Ordering::SeqCst) {
            return Err(TransportError::Api(
                "sendDocument failed (413): Request Entity Too Large".to_string(),
            ));
        }
        let entries = read_archive(path);
        self.documents.lock().unwrap().push(SentDocument {
            conversation,
            file_name: file_name.to_string(),
            entries,
        });
        Ok(())
    }

    async fn download(
        &self,
        file_id: &str,
        destination: &Path,
        max_bytes: u64,
    ) -> Result<u64, TransportError> {
        self.downloads.lock().unwrap().push(file_id.to_string());
        if file_id.starts_with(OVERSIZED_PREFIX) {
            return Err(TransportError::TooLarge { limit: max_bytes });
        }
        let content = format!("content of {}", file_id);
        tokio::fs::write(destination, &content).await?;
        Ok(content.len() as u64)
    }
}
