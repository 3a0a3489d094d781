use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{Client, Collection, bson::doc};
use serde::Deserialize;

use crate::error::{MongoErrorContext, Result};
use crate::models::StreamMarker;

#[derive(Clone, Debug)]
pub struct StreamRepository {
    collection: Collection<StreamMarker>,
}

#[derive(Deserialize)]
struct StreamIdOnly {
    id: String,
}

impl StreamRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("streams");
        Self { collection }
    }

    pub async fn create(&self, stream_id: &str, chat_id: &str) -> Result<()> {
        let marker = StreamMarker {
            id: stream_id.to_string(),
            chat_id: chat_id.to_string(),
            created_at: Utc::now(),
        };
        self.collection
            .insert_one(&marker)
            .await
            .op_context("Failed to create stream id")?;
        Ok(())
    }

    /// Stream ids for a chat, oldest first.
    pub async fn ids_by_chat_id(&self, chat_id: &str) -> Result<Vec<String>> {
        let ids: Vec<StreamIdOnly> = self
            .collection
            .clone_with_type::<StreamIdOnly>()
            .find(doc! { "chatId": chat_id })
            .sort(doc! { "createdAt": 1 })
            .projection(doc! { "id": 1, "_id": 0 })
            .await
            .op_context("Failed to get stream ids by chat id")?
            .try_collect()
            .await
            .op_context("Failed to get stream ids by chat id")?;
        Ok(ids.into_iter().map(|s| s.id).collect())
    }

    pub async fn delete_by_chat_id(&self, chat_id: &str) -> Result<()> {
        self.collection
            .delete_many(doc! { "chatId": chat_id })
            .await
            .op_context("Failed to delete stream ids by chat id")?;
        Ok(())
    }
}
