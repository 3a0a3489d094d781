use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, IndexModel, bson, bson::Document as BsonDocument, bson::doc};
use serde::Deserialize;

use crate::error::{MongoErrorContext, Result};
use crate::models::Message;

#[derive(Clone, Debug)]
pub struct MessageRepository {
    collection: Collection<Message>,
}

#[derive(Deserialize)]
struct MessageIdOnly {
    id: String,
}

impl MessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    /// Save a batch of messages (one conversation turn). No-op when empty.
    pub async fn save_many(&self, messages: Vec<Message>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        self.collection
            .insert_many(messages)
            .await
            .op_context("Failed to save messages")?;
        Ok(())
    }

    pub async fn get_by_chat_id(&self, chat_id: &str) -> Result<Vec<Message>> {
        let messages = self
            .collection
            .find(doc! { "chatId": chat_id })
            .sort(doc! { "createdAt": 1 })
            .await
            .op_context("Failed to get messages by chat id")?
            .try_collect()
            .await
            .op_context("Failed to get messages by chat id")?;
        Ok(messages)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Vec<Message>> {
        let messages = self
            .collection
            .find(doc! { "id": id })
            .await
            .op_context("Failed to get message by id")?
            .try_collect()
            .await
            .op_context("Failed to get message by id")?;
        Ok(messages)
    }

    /// Ids of a chat's messages created at or after `timestamp` (inclusive,
    /// so the resend anchor itself is replaced too).
    pub async fn ids_after(&self, chat_id: &str, timestamp: DateTime<Utc>) -> Result<Vec<String>> {
        let ids: Vec<MessageIdOnly> = self
            .collection
            .clone_with_type::<MessageIdOnly>()
            .find(messages_from_filter(chat_id, timestamp))
            .projection(doc! { "id": 1, "_id": 0 })
            .await
            .op_context("Failed to get messages by chat id after timestamp")?
            .try_collect()
            .await
            .op_context("Failed to get messages by chat id after timestamp")?;
        Ok(ids.into_iter().map(|m| m.id).collect())
    }

    pub async fn delete_by_ids(&self, chat_id: &str, ids: &[String]) -> Result<()> {
        self.collection
            .delete_many(doc! { "chatId": chat_id, "id": { "$in": ids.to_vec() } })
            .await
            .op_context("Failed to delete messages by chat id after timestamp")?;
        Ok(())
    }

    pub async fn delete_by_chat_id(&self, chat_id: &str) -> Result<()> {
        self.collection
            .delete_many(doc! { "chatId": chat_id })
            .await
            .op_context("Failed to delete messages by chat id")?;
        Ok(())
    }

    /// Count user-authored messages since `since`, restricted to the given
    /// chat ids (the caller resolves chat ownership first).
    pub async fn count_user_messages_since(
        &self,
        chat_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<u64> {
        self.collection
            .count_documents(recent_user_messages_filter(chat_ids, since))
            .await
            .op_context("Failed to get message count by user id")
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder().keys(doc! { "chatId": 1 }).build();
        self.collection
            .create_index(index)
            .await
            .op_context("Failed to create index on messages.chatId")?;
        Ok(())
    }
}

/// Inclusive lower bound: a rewind from `timestamp` removes the message at
/// the timestamp as well (unlike the strict document-version cascade).
fn messages_from_filter(chat_id: &str, timestamp: DateTime<Utc>) -> BsonDocument {
    doc! {
        "chatId": chat_id,
        "createdAt": { "$gte": bson::DateTime::from_millis(timestamp.timestamp_millis()) },
    }
}

fn recent_user_messages_filter(chat_ids: &[String], since: DateTime<Utc>) -> BsonDocument {
    doc! {
        "role": "user",
        "createdAt": { "$gte": bson::DateTime::from_millis(since.timestamp_millis()) },
        "chatId": { "$in": chat_ids.to_vec() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::Bson;

    #[test]
    fn test_rewind_filter_is_inclusive() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let filter = messages_from_filter("chat-1", ts);

        let range = filter.get_document("createdAt").unwrap();
        assert_eq!(
            range.get("$gte"),
            Some(&Bson::DateTime(bson::DateTime::from_millis(
                1_700_000_000_000
            )))
        );
        assert!(!range.contains_key("$gt"));
    }

    #[test]
    fn test_usage_filter_gates_on_role_window_and_ownership() {
        let since = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let owned = vec!["chat-1".to_string(), "chat-2".to_string()];
        let filter = recent_user_messages_filter(&owned, since);

        assert_eq!(filter.get_str("role").unwrap(), "user");
        assert!(filter
            .get_document("createdAt")
            .unwrap()
            .contains_key("$gte"));

        let ids = filter
            .get_document("chatId")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], Bson::String("chat-1".to_string()));
    }

    #[test]
    fn test_usage_filter_with_no_owned_chats_matches_nothing() {
        let since = Utc.timestamp_millis_opt(0).unwrap();
        let filter = recent_user_messages_filter(&[], since);
        let ids = filter
            .get_document("chatId")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert!(ids.is_empty());
    }
}
