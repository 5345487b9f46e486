//! Telegram Bot API client
//!
//! Implements [`Transport`] over the HTTPS Bot API with reqwest. The bot
//! token is part of every URL, so request URLs are never logged.

use super::{MessageRef, Transport, TransportError};
use crate::batch::ConversationId;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("dcr-bot/", env!("CARGO_PKG_VERSION"));

/// Generous enough for a 50 MB upload/download on a slow link
const REQUEST_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T, TransportError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(TransportError::Api(format!("{} returned no result", method))),
            (false, _) => Err(TransportError::Api(format!(
                "{} failed ({}): {}",
                method,
                self.error_code.map_or_else(|| "?".to_string(), |c| c.to_string()),
                self.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    #[serde(default)]
    file_path: Option<String>,
}

/// Bot API client
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http_client: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    /// `api_base` is normally `https://api.telegram.org`
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TransportError> {
        debug!(method = %method, "Calling Bot API");
        let response: ApiResponse<T> = self
            .http_client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        response.into_result(method)
    }

    /// Register the webhook URL Telegram should POST updates to
    pub async fn set_webhook(&self, url: &str) -> Result<(), TransportError> {
        let accepted: bool = self.call("setWebhook", json!({ "url": url })).await?;
        if !accepted {
            return Err(TransportError::Api("setWebhook was not accepted".to_string()));
        }
        info!(url = %url, "Webhook registered");
        Ok(())
    }

    /// The bot's own username, used to recognise `/command@username`
    pub async fn get_me(&self) -> Result<String, TransportError> {
        let me: BotUser = self.call("getMe", json!({})).await?;
        me.username
            .ok_or_else(|| TransportError::Api("getMe returned no username".to_string()))
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_text(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<MessageRef, TransportError> {
        let sent: SentMessage = self
            .call("sendMessage", json!({ "chat_id": conversation.0, "text": text }))
            .await?;
        Ok(MessageRef {
            conversation,
            message_id: sent.message_id,
        })
    }

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<(), TransportError> {
        // Result is the edited Message (or `true` for inline messages)
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                json!({
                    "chat_id": message.conversation.0,
                    "message_id": message.message_id,
                    "text": text,
                }),
            )
            .await?;
        Ok(())
    }

    async fn send_document(
        &self,
        conversation: ConversationId,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TransportError> {
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/zip")?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", conversation.0.to_string())
            .part("document", part);

        let response: ApiResponse<serde_json::Value> = self
            .http_client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        response.into_result("sendDocument")?;

        info!(chat_id = %conversation, file_name = %file_name, bytes = size, "Document sent");
        Ok(())
    }

    async fn download(
        &self,
        file_id: &str,
        destination: &Path,
        max_bytes: u64,
    ) -> Result<u64, TransportError> {
        let remote: RemoteFile = self.call("getFile", json!({ "file_id": file_id })).await?;
        let file_path = remote
            .file_path
            .ok_or_else(|| TransportError::Api("getFile returned no file_path".to_string()))?;

        let mut response = self
            .http_client
            .get(self.file_url(&file_path))
            .send()
            .await?
            .error_for_status()?;

        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Err(TransportError::TooLarge { limit: max_bytes });
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut written: u64 = 0;
        let outcome = async {
            while let Some(chunk) = response.chunk().await? {
                written += chunk.len() as u64;
                if written > max_bytes {
                    return Err(TransportError::TooLarge { limit: max_bytes });
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<(), TransportError>(())
        }
        .await;

        if let Err(e) = outcome {
            drop(file);
            if let Err(remove_err) = tokio::fs::remove_file(destination).await {
                warn!(
                    path = %destination.display(),
                    error = %remove_err,
                    "Failed to remove partial download"
                );
            }
            return Err(e);
        }

        debug!(file_id = %file_id, bytes = written, "File downloaded");
        Ok(written)
    }
}
