use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ephemeral marker for an in-flight or completed generation stream tied to
/// a chat. Removed together with the chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMarker {
    pub id: String,
    pub chat_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
