//! Finalize: drain the batch, bundle it, deliver it, clean up

use super::{messages, remove_file_logged, Relay};
use crate::batch::{ConversationId, OutputRef};
use crate::error::RelayError;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use uuid::Uuid;

/// Result of a finalize that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The batch was empty; nothing was built
    Empty,
    /// An archive with `files` entries was delivered
    Delivered { files: usize },
}

/// Attachment name shown to the user
pub fn archive_file_name(conversation: ConversationId) -> String {
    format!("batch_{}.zip", conversation)
}

impl Relay {
    /// `/done`: always produces exactly one reply (archive, empty notice, or failure)
    pub async fn finalize(&self, conversation: ConversationId) {
        match self.run_finalize(conversation).await {
            Ok(FinalizeOutcome::Empty) => {
                info!(chat_id = %conversation, "Finalize requested on empty batch");
                self.reply(conversation, messages::NO_FILES).await;
            }
            Ok(FinalizeOutcome::Delivered { files }) => {
                info!(chat_id = %conversation, files = files, "Batch delivered");
            }
            Err(e) => {
                error!(chat_id = %conversation, error = %e, "Finalize failed");
                self.record_error("finalize", &e).await;
                self.reply(conversation, &messages::finalize_failed(&e)).await;
            }
        }
    }

    /// Snapshot-and-clear, then bundle and send
    ///
    /// Outputs in the snapshot and the archive are removed whatever the
    /// outcome; the batch is already empty so they would be unreachable.
    pub async fn run_finalize(
        &self,
        conversation: ConversationId,
    ) -> Result<FinalizeOutcome, RelayError> {
        let snapshot = self.store.snapshot_and_clear(conversation).await;
        if snapshot.is_empty() {
            return Ok(FinalizeOutcome::Empty);
        }

        let archive_path = self
            .settings
            .work_dir
            .join(format!("batch_{}_{}.zip", conversation, Uuid::new_v4()));

        let result = self.bundle_and_send(conversation, &snapshot, &archive_path).await;

        self.discard_outputs(&snapshot).await;
        remove_file_logged(&archive_path).await;

        result.map(|()| FinalizeOutcome::Delivered {
            files: snapshot.len(),
        })
    }

    async fn bundle_and_send(
        &self,
        conversation: ConversationId,
        snapshot: &[OutputRef],
        archive_path: &Path,
    ) -> Result<(), RelayError> {
        let files: Vec<PathBuf> = snapshot.iter().map(|o| o.path().to_path_buf()).collect();
        let archive = self.archiver.bundle(&files, archive_path).await?;

        self.transport
            .send_document(conversation, &archive, &archive_file_name(conversation))
            .await
            .map_err(RelayError::Delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_file_name() {
        assert_eq!(archive_file_name(ConversationId(42)), "batch_42.zip");
        assert_eq!(archive_file_name(ConversationId(-1001)), "batch_-1001.zip");
    }
}
