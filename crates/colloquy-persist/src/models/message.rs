use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message. `parts` and `attachments` are stored as
/// schemaless JSON; their structure belongs to the front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub role: MessageRole,
    pub parts: serde_json::Value,
    pub attachments: serde_json::Value,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

/// An up/down vote on a message. Identity is the (chatId, messageId) pair;
/// there is no separate application id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub chat_id: String,
    pub message_id: String,
    pub is_upvoted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, Bson};

    #[test]
    fn test_message_wire_shape() {
        let message = Message {
            id: "msg-1".to_string(),
            chat_id: "chat-1".to_string(),
            role: MessageRole::User,
            parts: serde_json::json!([{ "type": "text", "text": "hello" }]),
            attachments: serde_json::json!([]),
            created_at: Utc::now(),
        };

        let doc = bson::to_document(&message).unwrap();
        assert_eq!(doc.get_str("chatId").unwrap(), "chat-1");
        // The usage aggregator filters on the literal string "user".
        assert_eq!(doc.get_str("role").unwrap(), "user");
        assert!(matches!(doc.get("createdAt"), Some(Bson::DateTime(_))));
    }

    #[test]
    fn test_vote_wire_shape() {
        let vote = Vote {
            chat_id: "chat-1".to_string(),
            message_id: "msg-1".to_string(),
            is_upvoted: true,
        };

        let doc = bson::to_document(&vote).unwrap();
        assert_eq!(doc.get_str("messageId").unwrap(), "msg-1");
        assert!(doc.get_bool("isUpvoted").unwrap());
    }
}
