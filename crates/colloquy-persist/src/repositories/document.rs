use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, bson, bson::Document as BsonDocument, bson::doc};

use crate::error::{MongoErrorContext, Result};
use crate::models::{Document, DocumentKind};

#[derive(Clone, Debug)]
pub struct DocumentRepository {
    collection: Collection<Document>,
}

impl DocumentRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("documents");
        Self { collection }
    }

    /// Insert a new version of a document and return it. Versions share the
    /// same `id`; this never overwrites an earlier version.
    pub async fn save(
        &self,
        id: &str,
        title: &str,
        kind: DocumentKind,
        content: Option<String>,
        user_id: &str,
    ) -> Result<Document> {
        let document = Document {
            id: id.to_string(),
            title: title.to_string(),
            kind,
            content,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        self.collection
            .insert_one(&document)
            .await
            .op_context("Failed to save document")?;
        Ok(document)
    }

    /// All versions of a document, oldest first.
    pub async fn get_versions(&self, id: &str) -> Result<Vec<Document>> {
        let documents = self
            .collection
            .find(doc! { "id": id })
            .sort(doc! { "createdAt": 1 })
            .await
            .op_context("Failed to get documents by id")?
            .try_collect()
            .await
            .op_context("Failed to get documents by id")?;
        Ok(documents)
    }

    /// The current (most recent) version, if any version exists.
    pub async fn get_latest(&self, id: &str) -> Result<Option<Document>> {
        self.collection
            .find_one(doc! { "id": id })
            .sort(doc! { "createdAt": -1 })
            .await
            .op_context("Failed to get document by id")
    }

    /// Delete every version created strictly after `timestamp`; returns the
    /// number of versions removed.
    pub async fn delete_after(&self, id: &str, timestamp: DateTime<Utc>) -> Result<u64> {
        let result = self
            .collection
            .delete_many(versions_after_filter(id, timestamp))
            .await
            .op_context("Failed to delete documents by id after timestamp")?;
        Ok(result.deleted_count)
    }
}

/// Strict lower bound: the version at `timestamp` is the rollback target
/// and survives.
fn versions_after_filter(id: &str, timestamp: DateTime<Utc>) -> BsonDocument {
    doc! {
        "id": id,
        "createdAt": { "$gt": bson::DateTime::from_millis(timestamp.timestamp_millis()) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::Bson;

    #[test]
    fn test_version_rollback_filter_is_strict() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let filter = versions_after_filter("doc-1", ts);

        assert_eq!(filter.get_str("id").unwrap(), "doc-1");
        let range = filter.get_document("createdAt").unwrap();
        assert_eq!(
            range.get("$gt"),
            Some(&Bson::DateTime(bson::DateTime::from_millis(
                1_700_000_000_000
            )))
        );
        assert!(!range.contains_key("$gte"));
    }
}
