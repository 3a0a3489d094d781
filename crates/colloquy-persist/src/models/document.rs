use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One version of a generated document. Versions share the same `id` and
/// are distinguished by `created_at`; the current version is the most
/// recent one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub kind: DocumentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub user_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Text,
    Code,
    Image,
    Sheet,
}

/// An edit suggestion pinned to one specific document version via
/// (`document_id`, `document_created_at`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub document_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub document_created_at: DateTime<Utc>,
    pub original_text: String,
    pub suggested_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_resolved: bool,
    pub user_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, Bson};

    #[test]
    fn test_suggestion_pin_wire_shape() {
        let suggestion = Suggestion {
            id: "sugg-1".to_string(),
            document_id: "doc-1".to_string(),
            document_created_at: Utc::now(),
            original_text: "teh".to_string(),
            suggested_text: "the".to_string(),
            description: None,
            is_resolved: false,
            user_id: "user-1".to_string(),
            created_at: Utc::now(),
        };

        let doc = bson::to_document(&suggestion).unwrap();
        assert_eq!(doc.get_str("documentId").unwrap(), "doc-1");
        // The version-cascade delete filters on documentCreatedAt as a BSON
        // datetime; a string here would silently match nothing.
        assert!(matches!(doc.get("documentCreatedAt"), Some(Bson::DateTime(_))));
        assert!(!doc.contains_key("description"));
    }

    #[test]
    fn test_document_kind_is_lowercase() {
        assert_eq!(
            bson::to_bson(&DocumentKind::Sheet).unwrap(),
            Bson::String("sheet".to_string())
        );
    }
}
