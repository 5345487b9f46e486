//! Telegram update payloads
//!
//! Only the fields the relay reads are modelled; everything else in the
//! update JSON is ignored.

use super::{InboundEvent, InboundFile};
use crate::batch::ConversationId;
use serde::Deserialize;

/// Incoming update delivered to the webhook
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Bot commands the relay understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Done,
}

/// Parse `/start`, `/done` and their `@botname` forms; arguments are ignored
///
/// In group chats Telegram delivers commands meant for every bot, so a
/// `@botname` suffix must name `bot_username` when it is known. With no
/// known username any suffix is accepted.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    let (name, addressee) = match command.split_once('@') {
        Some((name, addressee)) => (name, Some(addressee)),
        None => (command, None),
    };
    if let (Some(addressee), Some(ours)) = (addressee, bot_username) {
        if !addressee.eq_ignore_ascii_case(ours.trim_start_matches('@')) {
            return None;
        }
    }
    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "done" => Some(Command::Done),
        _ => None,
    }
}

impl InboundEvent {
    /// Decode an update, or `None` for traffic the relay does not handle
    pub fn from_update(update: &Update, bot_username: Option<&str>) -> Option<Self> {
        let message = update.message.as_ref()?;
        let conversation = ConversationId(message.chat.id);

        if let Some(document) = &message.document {
            return Some(InboundEvent::FileUploaded {
                conversation,
                file: InboundFile {
                    file_id: document.file_id.clone(),
                    file_name: document.file_name.clone().unwrap_or_default(),
                    declared_size: document.file_size.unwrap_or(0),
                },
            });
        }

        match parse_command(message.text.as_deref()?, bot_username)? {
            Command::Start => Some(InboundEvent::StartBatch { conversation }),
            Command::Done => Some(InboundEvent::FinalizeBatch { conversation }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Option<InboundEvent> {
        let update: Update = serde_json::from_value(value).unwrap();
        InboundEvent::from_update(&update, None)
    }

    #[test]
    fn test_parse_command_variants() {
        assert_eq!(parse_command("/start", None), Some(Command::Start));
        assert_eq!(parse_command("/done", None), Some(Command::Done));
        assert_eq!(parse_command("/done@DocRelayBot", None), Some(Command::Done));
        assert_eq!(parse_command("  /START now", None), Some(Command::Start));
        assert_eq!(parse_command("/help", None), None);
        assert_eq!(parse_command("done", None), None);
        assert_eq!(parse_command("", None), None);
    }

    #[test]
    fn test_command_addressed_to_other_bot_is_ignored() {
        let ours = Some("DocRelayBot");
        assert_eq!(parse_command("/done@DocRelayBot", ours), Some(Command::Done));
        assert_eq!(parse_command("/done@docrelaybot", ours), Some(Command::Done));
        assert_eq!(parse_command("/start", ours), Some(Command::Start));
        assert_eq!(parse_command("/done@OtherBot", ours), None);
        assert_eq!(parse_command("/start@OtherBot", ours), None);

        let update: Update = serde_json::from_value(json!({
            "update_id": 5,
            "message": {"message_id": 5, "chat": {"id": -1}, "text": "/done@OtherBot"}
        }))
        .unwrap();
        assert_eq!(InboundEvent::from_update(&update, ours), None);
        assert_eq!(
            InboundEvent::from_update(&update, None),
            Some(InboundEvent::FinalizeBatch { conversation: ConversationId(-1) })
        );
    }

    #[test]
    fn test_document_message_becomes_file_event() {
        let event = decode(json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "date": 1700000000,
                "chat": {"id": -4242, "type": "group"},
                "document": {
                    "file_id": "BQACAgIAAxkBAAIB",
                    "file_unique_id": "AgADBQ",
                    "file_name": "report.docx",
                    "mime_type": "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                    "file_size": 2097152
                }
            }
        }));

        assert_eq!(
            event,
            Some(InboundEvent::FileUploaded {
                conversation: ConversationId(-4242),
                file: InboundFile {
                    file_id: "BQACAgIAAxkBAAIB".to_string(),
                    file_name: "report.docx".to_string(),
                    declared_size: 2_097_152,
                },
            })
        );
    }

    #[test]
    fn test_document_without_name_or_size() {
        let event = decode(json!({
            "update_id": 11,
            "message": {"message_id": 6, "chat": {"id": 7}, "document": {"file_id": "abc"}}
        }))
        .unwrap();

        match event {
            InboundEvent::FileUploaded { file, .. } => {
                assert_eq!(file.file_name, "");
                assert_eq!(file.declared_size, 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_commands_become_batch_events() {
        let start = decode(json!({
            "update_id": 1,
            "message": {"message_id": 1, "chat": {"id": 99}, "text": "/start"}
        }));
        assert_eq!(start, Some(InboundEvent::StartBatch { conversation: ConversationId(99) }));

        let done = decode(json!({
            "update_id": 2,
            "message": {"message_id": 2, "chat": {"id": 99}, "text": "/done"}
        }));
        assert_eq!(done, Some(InboundEvent::FinalizeBatch { conversation: ConversationId(99) }));
    }

    #[test]
    fn test_other_updates_are_ignored() {
        assert_eq!(
            decode(json!({
                "update_id": 3,
                "message": {"message_id": 3, "chat": {"id": 1}, "text": "hello"}
            })),
            None
        );
        assert_eq!(
            decode(json!({"update_id": 4, "edited_message": {"message_id": 4, "chat": {"id": 1}}})),
            None
        );
    }
}
