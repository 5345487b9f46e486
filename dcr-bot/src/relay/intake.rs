//! Intake: validate → fetch → convert → record, one uploaded file at a time

use super::{messages, remove_dir_logged, remove_file_logged, Relay};
use crate::batch::{ConversationId, OutputRef};
use crate::error::RelayError;
use crate::transport::{InboundFile, TransportError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Name used when the sender supplied none (or nothing usable)
const FALLBACK_FILE_NAME: &str = "document";

/// Reduce a sender-supplied name to a safe single path component
///
/// ```
/// use dcr_bot::relay::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("../../etc/report.docx"), "report.docx");
/// assert_eq!(sanitize_file_name("C:\\Users\\me\\memo.doc"), "memo.doc");
/// assert_eq!(sanitize_file_name(".."), "document");
/// ```
pub fn sanitize_file_name(raw: &str) -> String {
    let last = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

impl Relay {
    /// Handle one uploaded file; always produces exactly one reply
    pub async fn handle_file(&self, conversation: ConversationId, file: InboundFile) {
        let file_name = sanitize_file_name(&file.file_name);
        let limit = self.settings.max_file_size_bytes;

        // Size gate: nothing is fetched for an oversized declaration
        if file.declared_size > limit {
            warn!(
                chat_id = %conversation,
                file_name = %file_name,
                declared_size = file.declared_size,
                limit = limit,
                "File rejected by size limit"
            );
            let text = messages::too_large(&file_name, Some(file.declared_size), limit);
            self.reply(conversation, &text).await;
            return;
        }

        let placeholder = match self
            .transport
            .send_text(conversation, &messages::converting(&file_name))
            .await
        {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(chat_id = %conversation, error = %e, "Failed to send progress message");
                None
            }
        };

        let text = match self.run_intake(conversation, &file.file_id, &file_name).await {
            Ok(batch_len) => {
                info!(
                    chat_id = %conversation,
                    file_name = %file_name,
                    batch_len = batch_len,
                    "File converted and added to batch"
                );
                messages::converted(&file_name, batch_len)
            }
            Err(e) => {
                warn!(
                    chat_id = %conversation,
                    file_name = %file_name,
                    error = %e,
                    "Intake failed"
                );
                self.record_error("intake", &e).await;
                messages::intake_failed(&file_name, &e)
            }
        };

        self.finish_reply(conversation, placeholder, &text).await;
    }

    /// Fetch and convert into a private scratch directory
    ///
    /// The fetched source is always deleted. On failure the whole scratch
    /// directory goes too and the batch is left untouched. Returns the batch
    /// size after the append.
    async fn run_intake(
        &self,
        conversation: ConversationId,
        file_id: &str,
        file_name: &str,
    ) -> Result<usize, RelayError> {
        let scratch = self.settings.work_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&scratch).await?;
        let source = scratch.join(file_name);

        let result = self.fetch_and_convert(file_id, &source).await;
        remove_file_logged(&source).await;

        match result {
            Ok(output) => Ok(self.store.append(conversation, OutputRef::new(output)).await),
            Err(e) => {
                remove_dir_logged(&scratch).await;
                Err(e)
            }
        }
    }

    async fn fetch_and_convert(&self, file_id: &str, source: &Path) -> Result<PathBuf, RelayError> {
        let limit = self.settings.max_file_size_bytes;
        self.transport
            .download(file_id, source, limit)
            .await
            .map_err(|e| match e {
                TransportError::TooLarge { limit } => RelayError::FileTooLarge { size: None, limit },
                other => RelayError::Fetch(other),
            })?;

        let timeout = self.settings.conversion_timeout;
        match tokio::time::timeout(timeout, self.converter.convert(source)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!(
                    converter = self.converter.name(),
                    source = %source.display(),
                    timeout_secs = timeout.as_secs(),
                    "Conversion timed out"
                );
                Err(RelayError::ConversionTimedOut(timeout))
            }
        }
    }
}
