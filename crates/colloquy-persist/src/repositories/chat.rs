use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, IndexModel, bson, bson::Document as BsonDocument, bson::doc};
use serde::Deserialize;

use crate::error::{MongoErrorContext, PersistError, Result};
use crate::models::{Chat, ChatPage, ChatVisibility};

#[derive(Clone, Debug)]
pub struct ChatRepository {
    collection: Collection<Chat>,
}

#[derive(Deserialize)]
struct ChatIdOnly {
    id: String,
}

impl ChatRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("chats");
        Self { collection }
    }

    pub async fn save(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        visibility: ChatVisibility,
    ) -> Result<()> {
        let chat = Chat {
            id: id.to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            visibility,
            created_at: Utc::now(),
        };
        self.collection
            .insert_one(&chat)
            .await
            .op_context("Failed to save chat")?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Chat>> {
        self.collection
            .find_one(doc! { "id": id })
            .await
            .op_context("Failed to get chat by id")
    }

    /// One page of a user's chats, newest first, anchored by an existing
    /// chat id. At most one anchor may be supplied; the anchor chat itself
    /// is never part of the page.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u32,
        starting_after: Option<&str>,
        ending_before: Option<&str>,
    ) -> Result<ChatPage> {
        validate_page_request(limit, starting_after, ending_before)?;

        let anchor = match (starting_after, ending_before) {
            (Some(id), None) => Some(PageAnchor::After(self.require_anchor(id).await?.created_at)),
            (None, Some(id)) => Some(PageAnchor::Before(self.require_anchor(id).await?.created_at)),
            _ => None,
        };

        let chats: Vec<Chat> = self
            .collection
            .find(page_filter(user_id, anchor))
            .sort(doc! { "createdAt": -1 })
            .limit(i64::from(limit) + 1)
            .await
            .op_context("Failed to get chats by user id")?
            .try_collect()
            .await
            .op_context("Failed to get chats by user id")?;

        Ok(truncate_page(chats, limit as usize))
    }

    async fn require_anchor(&self, id: &str) -> Result<Chat> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| PersistError::NotFound(format!("Chat with id {} not found", id)))
    }

    /// Ids of every chat owned by a user, for the messages-in-owned-chats join.
    pub async fn ids_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        let ids: Vec<ChatIdOnly> = self
            .collection
            .clone_with_type::<ChatIdOnly>()
            .find(doc! { "userId": user_id })
            .projection(doc! { "id": 1, "_id": 0 })
            .await
            .op_context("Failed to get chat ids by user id")?
            .try_collect()
            .await
            .op_context("Failed to get chat ids by user id")?;
        Ok(ids.into_iter().map(|c| c.id).collect())
    }

    pub async fn update_visibility(&self, id: &str, visibility: ChatVisibility) -> Result<()> {
        self.collection
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "visibility": visibility.as_str() } },
            )
            .await
            .op_context("Failed to update chat visibility by id")?;
        Ok(())
    }

    /// Atomically remove a chat and return the pre-deletion document.
    pub async fn find_and_delete(&self, id: &str) -> Result<Option<Chat>> {
        self.collection
            .find_one_and_delete(doc! { "id": id })
            .await
            .op_context("Failed to delete chat by id")
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder().keys(doc! { "userId": 1 }).build();
        self.collection
            .create_index(index)
            .await
            .op_context("Failed to create index on chats.userId")?;
        Ok(())
    }
}

fn validate_page_request(
    limit: u32,
    starting_after: Option<&str>,
    ending_before: Option<&str>,
) -> Result<()> {
    if limit == 0 {
        return Err(PersistError::BadRequest(
            "page size must be positive".to_string(),
        ));
    }
    if starting_after.is_some() && ending_before.is_some() {
        return Err(PersistError::BadRequest(
            "starting_after and ending_before are mutually exclusive".to_string(),
        ));
    }
    Ok(())
}

/// Resolved pagination anchor: a page is bounded in at most one direction,
/// which this type makes unrepresentable to get wrong.
#[derive(Debug, Clone, Copy)]
enum PageAnchor {
    After(DateTime<Utc>),
    Before(DateTime<Utc>),
}

/// Filter for one page of a user's chats. Strict inequalities on the
/// anchor's creation time keep the anchor itself off the page.
fn page_filter(user_id: &str, anchor: Option<PageAnchor>) -> BsonDocument {
    let mut filter = doc! { "userId": user_id };
    match anchor {
        Some(PageAnchor::After(after)) => {
            filter.insert(
                "createdAt",
                doc! { "$gt": bson::DateTime::from_millis(after.timestamp_millis()) },
            );
        }
        Some(PageAnchor::Before(before)) => {
            filter.insert(
                "createdAt",
                doc! { "$lt": bson::DateTime::from_millis(before.timestamp_millis()) },
            );
        }
        None => {}
    }
    filter
}

/// The page query fetches `limit + 1` documents; the extra one only signals
/// that another page exists.
fn truncate_page(mut chats: Vec<Chat>, limit: usize) -> ChatPage {
    let has_more = chats.len() > limit;
    if has_more {
        chats.truncate(limit);
    }
    ChatPage { chats, has_more }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn chat(id: &str, ts: i64) -> Chat {
        Chat {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            title: "test".to_string(),
            visibility: ChatVisibility::Private,
            created_at: Utc.timestamp_millis_opt(ts).unwrap(),
        }
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let err = validate_page_request(0, None, None).unwrap_err();
        assert!(matches!(err, PersistError::BadRequest(_)));
    }

    #[test]
    fn test_both_anchors_are_rejected() {
        let err = validate_page_request(10, Some("a"), Some("b")).unwrap_err();
        assert!(matches!(err, PersistError::BadRequest(_)));
    }

    #[test]
    fn test_single_anchor_is_accepted() {
        assert!(validate_page_request(10, Some("a"), None).is_ok());
        assert!(validate_page_request(10, None, Some("b")).is_ok());
        assert!(validate_page_request(1, None, None).is_ok());
    }

    #[test]
    fn test_page_filter_without_anchor() {
        let filter = page_filter("user-1", None);
        assert_eq!(filter.get_str("userId").unwrap(), "user-1");
        assert!(!filter.contains_key("createdAt"));
    }

    #[test]
    fn test_page_filter_uses_strict_inequalities() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let filter = page_filter("user-1", Some(PageAnchor::After(ts)));
        let range = filter.get_document("createdAt").unwrap();
        assert_eq!(
            range.get("$gt"),
            Some(&bson::Bson::DateTime(bson::DateTime::from_millis(
                1_700_000_000_000
            )))
        );

        let filter = page_filter("user-1", Some(PageAnchor::Before(ts)));
        let range = filter.get_document("createdAt").unwrap();
        assert!(range.contains_key("$lt"));
        assert!(!range.contains_key("$lte"));
    }

    #[test]
    fn test_page_filter_bounds_in_one_direction_only() {
        // A page anchor carries exactly one direction, so the filter can
        // never bound createdAt on both sides.
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        for anchor in [PageAnchor::After(ts), PageAnchor::Before(ts)] {
            let range = page_filter("user-1", Some(anchor))
                .get_document("createdAt")
                .cloned()
                .unwrap();
            assert_eq!(range.len(), 1);
        }
    }

    #[test]
    fn test_full_page_with_sentinel_reports_has_more() {
        let chats = vec![chat("a", 3), chat("b", 2), chat("c", 1)];
        let page = truncate_page(chats, 2);
        assert!(page.has_more);
        assert_eq!(page.chats.len(), 2);
        // Order of the fetched (descending) page is preserved.
        assert_eq!(page.chats[0].id, "a");
        assert_eq!(page.chats[1].id, "b");
    }

    #[test]
    fn test_short_page_reports_no_more() {
        let chats = vec![chat("a", 2), chat("b", 1)];
        let page = truncate_page(chats, 2);
        assert!(!page.has_more);
        assert_eq!(page.chats.len(), 2);
    }

    #[test]
    fn test_empty_page() {
        let page = truncate_page(vec![], 5);
        assert!(!page.has_more);
        assert!(page.chats.is_empty());
    }
}
