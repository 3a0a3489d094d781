use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, bson, bson::Document as BsonDocument, bson::doc};

use crate::error::{MongoErrorContext, Result};
use crate::models::Suggestion;

#[derive(Clone, Debug)]
pub struct SuggestionRepository {
    collection: Collection<Suggestion>,
}

impl SuggestionRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("suggestions");
        Self { collection }
    }

    /// Batch insert. No-op when empty.
    pub async fn save_many(&self, suggestions: Vec<Suggestion>) -> Result<()> {
        if suggestions.is_empty() {
            return Ok(());
        }
        self.collection
            .insert_many(suggestions)
            .await
            .op_context("Failed to save suggestions")?;
        Ok(())
    }

    pub async fn get_by_document_id(&self, document_id: &str) -> Result<Vec<Suggestion>> {
        let suggestions = self
            .collection
            .find(doc! { "documentId": document_id })
            .await
            .op_context("Failed to get suggestions by document id")?
            .try_collect()
            .await
            .op_context("Failed to get suggestions by document id")?;
        Ok(suggestions)
    }

    /// Remove suggestions pinned to document versions created strictly after
    /// `timestamp`, ahead of those versions being deleted.
    pub async fn delete_for_versions_after(
        &self,
        document_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.collection
            .delete_many(pinned_after_filter(document_id, timestamp))
            .await
            .op_context("Failed to delete suggestions by document versions after timestamp")?;
        Ok(())
    }
}

fn pinned_after_filter(document_id: &str, timestamp: DateTime<Utc>) -> BsonDocument {
    doc! {
        "documentId": document_id,
        "documentCreatedAt": { "$gt": bson::DateTime::from_millis(timestamp.timestamp_millis()) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pin_filter_matches_document_version_cascade() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let filter = pinned_after_filter("doc-1", ts);

        assert_eq!(filter.get_str("documentId").unwrap(), "doc-1");
        // Same strict bound as the document-version delete, so suggestions
        // pinned to the surviving rollback target survive with it.
        let range = filter.get_document("documentCreatedAt").unwrap();
        assert!(range.contains_key("$gt"));
        assert!(!range.contains_key("$gte"));
    }
}
