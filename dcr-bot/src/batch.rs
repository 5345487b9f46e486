//! Per-conversation batch store
//!
//! Maps each conversation to the ordered list of converted outputs waiting
//! for the next finalize. Every operation is a single critical section, so a
//! finalize drains exactly the outputs present when it runs and an append
//! that completes afterwards lands in a fresh batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Stable identifier of a chat conversation, supplied by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to one converted output file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    path: PathBuf,
}

impl OutputRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Conversation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    /// No batch open (never contacted, or just finalized)
    #[default]
    Idle,
    /// Collecting converted files until `/done`
    Accumulating,
}

/// Storage for pending outputs keyed by conversation
///
/// An absent conversation behaves exactly like an empty, idle one.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Start a fresh batch, returning whatever the old batch still held
    async fn reset(&self, conversation: ConversationId) -> Vec<OutputRef>;

    /// Append a converted output, creating the batch if needed.
    /// Returns the batch size after the append.
    async fn append(&self, conversation: ConversationId, output: OutputRef) -> usize;

    /// Take the current contents and leave the batch empty, in one step
    async fn snapshot_and_clear(&self, conversation: ConversationId) -> Vec<OutputRef>;

    /// Number of pending outputs
    async fn len(&self, conversation: ConversationId) -> usize;

    /// Current lifecycle state
    async fn state(&self, conversation: ConversationId) -> ConversationState;
}

#[derive(Debug, Default)]
struct Batch {
    state: ConversationState,
    outputs: Vec<OutputRef>,
}

/// Process-lifetime batch store guarded by a single mutex
///
/// The lock is only held for map manipulation, never across I/O, so one
/// global lock does not serialise conversions of unrelated conversations.
#[derive(Debug, Default)]
pub struct MemoryBatchStore {
    batches: Mutex<HashMap<ConversationId, Batch>>,
}

impl MemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BatchStore for MemoryBatchStore {
    async fn reset(&self, conversation: ConversationId) -> Vec<OutputRef> {
        let mut batches = self.batches.lock().await;
        let batch = batches.entry(conversation).or_default();
        batch.state = ConversationState::Accumulating;
        std::mem::take(&mut batch.outputs)
    }

    async fn append(&self, conversation: ConversationId, output: OutputRef) -> usize {
        let mut batches = self.batches.lock().await;
        let batch = batches.entry(conversation).or_default();
        batch.state = ConversationState::Accumulating;
        batch.outputs.push(output);
        batch.outputs.len()
    }

    async fn snapshot_and_clear(&self, conversation: ConversationId) -> Vec<OutputRef> {
        let mut batches = self.batches.lock().await;
        match batches.get_mut(&conversation) {
            Some(batch) => {
                batch.state = ConversationState::Idle;
                std::mem::take(&mut batch.outputs)
            }
            None => Vec::new(),
        }
    }

    async fn len(&self, conversation: ConversationId) -> usize {
        let batches = self.batches.lock().await;
        batches.get(&conversation).map_or(0, |b| b.outputs.len())
    }

    async fn state(&self, conversation: ConversationId) -> ConversationState {
        let batches = self.batches.lock().await;
        batches.get(&conversation).map_or(ConversationState::Idle, |b| b.state)
    }
}
