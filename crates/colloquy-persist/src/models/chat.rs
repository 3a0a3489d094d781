use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub visibility: ChatVisibility,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatVisibility {
    Private,
    Public,
}

impl ChatVisibility {
    /// Wire value, for use inside `doc!` update documents.
    pub fn as_str(self) -> &'static str {
        match self {
            ChatVisibility::Private => "private",
            ChatVisibility::Public => "public",
        }
    }
}

/// One page of a user's chat history, newest first.
#[derive(Debug, Clone)]
pub struct ChatPage {
    pub chats: Vec<Chat>,
    pub has_more: bool,
}
