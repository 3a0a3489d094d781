use futures::TryStreamExt;
use mongodb::{Client, Collection, bson::Document as BsonDocument, bson::doc};

use crate::error::{MongoErrorContext, Result};
use crate::models::Vote;

#[derive(Clone, Debug)]
pub struct VoteRepository {
    collection: Collection<Vote>,
}

impl VoteRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("votes");
        Self { collection }
    }

    /// Record an up/down vote. Upsert keyed on (chatId, messageId), so a
    /// second vote for the same pair overwrites rather than duplicates.
    pub async fn upsert(&self, chat_id: &str, message_id: &str, is_upvoted: bool) -> Result<()> {
        self.collection
            .update_one(vote_filter(chat_id, message_id), vote_update(is_upvoted))
            .upsert(true)
            .await
            .op_context("Failed to vote message")?;
        Ok(())
    }

    pub async fn get_by_chat_id(&self, chat_id: &str) -> Result<Vec<Vote>> {
        let votes = self
            .collection
            .find(doc! { "chatId": chat_id })
            .await
            .op_context("Failed to get votes by chat id")?
            .try_collect()
            .await
            .op_context("Failed to get votes by chat id")?;
        Ok(votes)
    }

    pub async fn delete_by_chat_id(&self, chat_id: &str) -> Result<()> {
        self.collection
            .delete_many(doc! { "chatId": chat_id })
            .await
            .op_context("Failed to delete votes by chat id")?;
        Ok(())
    }

    /// Remove the votes attached to a specific set of messages, ahead of
    /// those messages being deleted.
    pub async fn delete_by_message_ids(&self, chat_id: &str, message_ids: &[String]) -> Result<()> {
        self.collection
            .delete_many(doc! { "chatId": chat_id, "messageId": { "$in": message_ids.to_vec() } })
            .await
            .op_context("Failed to delete votes by message ids")?;
        Ok(())
    }
}

/// Identity of a vote: the full (chatId, messageId) pair, never a subset,
/// so the upsert can only ever target one record.
fn vote_filter(chat_id: &str, message_id: &str) -> BsonDocument {
    doc! { "chatId": chat_id, "messageId": message_id }
}

fn vote_update(is_upvoted: bool) -> BsonDocument {
    doc! { "$set": { "isUpvoted": is_upvoted } }
}
