//! Test Helper Utilities
//!
//! Shared fixtures for dcr-bot integration tests: an in-memory transport
//! that records every reply, a scripted converter, and a relay wired to
//! both over a temporary work dir.

#![allow(dead_code)]

pub mod mock_converter;
pub mod mock_transport;

pub use mock_converter::MockConverter;
pub use mock_transport::{MockTransport, SentDocument, SentMessage};

use dcr_bot::archive::ZipArchiveBuilder;
use dcr_bot::batch::{ConversationId, MemoryBatchStore};
use dcr_bot::relay::{Relay, RelaySettings};
use dcr_bot::transport::{InboundEvent, InboundFile};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const MIB: u64 = 1024 * 1024;
pub const TEST_LIMIT: u64 = 50 * MIB;

/// Relay plus handles on its collaborators
pub struct TestRelay {
    pub relay: Arc<Relay>,
    pub transport: Arc<MockTransport>,
    pub converter: Arc<MockConverter>,
    pub work_dir: TempDir,
}

impl TestRelay {
    pub fn new() -> Self {
        Self::with_converter(MockConverter::new(), Duration::from_secs(5))
    }

    pub fn with_converter(converter: MockConverter, conversion_timeout: Duration) -> Self {
        let work_dir = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::new());
        let converter = Arc::new(converter);

        let relay = Relay::new(
            Arc::new(MemoryBatchStore::new()),
            converter.clone(),
            Arc::new(ZipArchiveBuilder::new()),
            transport.clone(),
            RelaySettings {
                max_file_size_bytes: TEST_LIMIT,
                work_dir: work_dir.path().to_path_buf(),
                conversion_timeout,
            },
        );

        Self {
            relay: Arc::new(relay),
            transport,
            converter,
            work_dir,
        }
    }

    pub async fn start(&self, chat: i64) {
        self.relay.dispatch(start(chat)).await;
    }

    pub async fn upload(&self, chat: i64, name: &str, size: u64) {
        self.relay.dispatch(upload(chat, name, size)).await;
    }

    pub async fn done(&self, chat: i64) {
        self.relay.dispatch(done(chat)).await;
    }

    pub async fn batch_len(&self, chat: i64) -> usize {
        self.relay.store().len(ConversationId(chat)).await
    }

    /// Names of everything left in the work dir
    pub fn work_dir_entries(&self) -> Vec<String> {
        list_dir(self.work_dir.path())
    }
}

pub fn start(chat: i64) -> InboundEvent {
    InboundEvent::StartBatch {
        conversation: ConversationId(chat),
    }
}

pub fn done(chat: i64) -> InboundEvent {
    InboundEvent::FinalizeBatch {
        conversation: ConversationId(chat),
    }
}

/// Upload event whose file id encodes the file name
pub fn upload(chat: i64, name: &str, size: u64) -> InboundEvent {
    InboundEvent::FileUploaded {
        conversation: ConversationId(chat),
        file: InboundFile {
            file_id: format!("file-{}", name),
            file_name: name.to_string(),
            declared_size: size,
        },
    }
}

pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
