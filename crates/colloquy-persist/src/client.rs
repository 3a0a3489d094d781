use chrono::{DateTime, Duration, Utc};
use mongodb::Client;
use tracing::{debug, info};

use crate::error::{PersistError, Result};
use crate::models::{
    Chat, ChatPage, ChatVisibility, Document, DocumentKind, Message, Suggestion, User, Vote,
};
use crate::repositories::{
    ChatRepository, DocumentRepository, MessageRepository, StreamRepository, SuggestionRepository,
    UserRepository, VoteRepository,
};

/// The query surface the application layer talks to. Owns one shared driver
/// handle and a repository per collection; every method is request-scoped.
#[derive(Debug)]
pub struct PersistClient {
    users: UserRepository,
    chats: ChatRepository,
    messages: MessageRepository,
    votes: VoteRepository,
    documents: DocumentRepository,
    suggestions: SuggestionRepository,
    streams: StreamRepository,
}

impl PersistClient {
    pub async fn connect(mongodb_uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        info!("Connected to MongoDB database {}", db_name);
        Ok(Self {
            users: UserRepository::new(&client, db_name),
            chats: ChatRepository::new(&client, db_name),
            messages: MessageRepository::new(&client, db_name),
            votes: VoteRepository::new(&client, db_name),
            documents: DocumentRepository::new(&client, db_name),
            suggestions: SuggestionRepository::new(&client, db_name),
            streams: StreamRepository::new(&client, db_name),
        })
    }

    /// Idempotent schema setup: unique index on users.email, plus the
    /// chat-owner and message-owner lookup indexes. Run once at deployment,
    /// not per request.
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.users.ensure_indexes().await?;
        self.chats.ensure_indexes().await?;
        self.messages.ensure_indexes().await?;
        info!("MongoDB indexes ensured");
        Ok(())
    }

    // -- Users --

    pub async fn get_user_by_email(&self, email: &str) -> Result<Vec<User>> {
        self.users.get_by_email(email).await
    }

    pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<()> {
        self.users.create(email, password_hash).await
    }

    pub async fn create_guest_user(&self) -> Result<User> {
        self.users.create_guest().await
    }

    // -- Chats --

    pub async fn save_chat(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        visibility: ChatVisibility,
    ) -> Result<()> {
        self.chats.save(id, user_id, title, visibility).await
    }

    pub async fn get_chat_by_id(&self, id: &str) -> Result<Option<Chat>> {
        self.chats.get_by_id(id).await
    }

    /// Cursor-paginated chat history, newest first. Fails `NotFound` when an
    /// anchor id does not resolve to an existing chat, and `BadRequest` when
    /// both anchors are supplied or the page size is zero.
    pub async fn list_chats(
        &self,
        user_id: &str,
        limit: u32,
        starting_after: Option<&str>,
        ending_before: Option<&str>,
    ) -> Result<ChatPage> {
        self.chats
            .list(user_id, limit, starting_after, ending_before)
            .await
    }

    /// Cascading delete: votes, messages, and stream markers go first, the
    /// chat itself last, so no window exists where the chat is gone while a
    /// later step could still fail. Returns the pre-deletion chat, or `None`
    /// if no such chat existed.
    pub async fn delete_chat(&self, id: &str) -> Result<Option<Chat>> {
        self.votes.delete_by_chat_id(id).await?;
        self.messages.delete_by_chat_id(id).await?;
        self.streams.delete_by_chat_id(id).await?;
        let chat = self.chats.find_and_delete(id).await?;
        debug!("Deleted chat {} and its dependents", id);
        Ok(chat)
    }

    pub async fn update_chat_visibility(
        &self,
        chat_id: &str,
        visibility: ChatVisibility,
    ) -> Result<()> {
        self.chats.update_visibility(chat_id, visibility).await
    }

    // -- Messages --

    pub async fn save_messages(&self, messages: Vec<Message>) -> Result<()> {
        self.messages.save_many(messages).await
    }

    pub async fn get_messages_by_chat_id(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.messages.get_by_chat_id(chat_id).await
    }

    pub async fn get_message_by_id(&self, id: &str) -> Result<Vec<Message>> {
        self.messages.get_by_id(id).await
    }

    /// Rewind a chat: delete every message created at or after `timestamp`
    /// (inclusive), removing the votes attached to those messages first.
    pub async fn delete_messages_after(
        &self,
        chat_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let message_ids = self.messages.ids_after(chat_id, timestamp).await?;
        if message_ids.is_empty() {
            return Ok(());
        }
        self.votes
            .delete_by_message_ids(chat_id, &message_ids)
            .await?;
        self.messages.delete_by_ids(chat_id, &message_ids).await?;
        debug!(
            "Deleted {} messages from chat {} after {}",
            message_ids.len(),
            chat_id,
            timestamp
        );
        Ok(())
    }

    // -- Votes --

    pub async fn vote_message(
        &self,
        chat_id: &str,
        message_id: &str,
        is_upvoted: bool,
    ) -> Result<()> {
        self.votes.upsert(chat_id, message_id, is_upvoted).await
    }

    pub async fn get_votes_by_chat_id(&self, chat_id: &str) -> Result<Vec<Vote>> {
        self.votes.get_by_chat_id(chat_id).await
    }

    // -- Documents --

    pub async fn save_document(
        &self,
        id: &str,
        title: &str,
        kind: DocumentKind,
        content: Option<String>,
        user_id: &str,
    ) -> Result<Document> {
        self.documents.save(id, title, kind, content, user_id).await
    }

    pub async fn get_documents_by_id(&self, id: &str) -> Result<Vec<Document>> {
        self.documents.get_versions(id).await
    }

    pub async fn get_latest_document(&self, id: &str) -> Result<Option<Document>> {
        self.documents.get_latest(id).await
    }

    /// Roll a document back to the version at `timestamp`: suggestions
    /// pinned to later versions go first, then the versions themselves
    /// (strictly after the timestamp). Returns the number of versions
    /// removed.
    pub async fn delete_document_versions_after(
        &self,
        id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<u64> {
        self.suggestions
            .delete_for_versions_after(id, timestamp)
            .await?;
        self.documents.delete_after(id, timestamp).await
    }

    // -- Suggestions --

    pub async fn save_suggestions(&self, suggestions: Vec<Suggestion>) -> Result<()> {
        self.suggestions.save_many(suggestions).await
    }

    pub async fn get_suggestions_by_document_id(
        &self,
        document_id: &str,
    ) -> Result<Vec<Suggestion>> {
        self.suggestions.get_by_document_id(document_id).await
    }

    // -- Usage --

    /// Sliding-window rate-limit count: user-authored messages within the
    /// window, restricted to chats the user owns. Authorship alone never
    /// counts; ownership of the chat gates it.
    pub async fn count_recent_user_messages(
        &self,
        user_id: &str,
        window_hours: i64,
    ) -> Result<u64> {
        let since = usage_window_start(Utc::now(), window_hours);
        let chat_ids = self.chats.ids_for_user(user_id).await?;
        if chat_ids.is_empty() {
            return Ok(0);
        }
        self.messages
            .count_user_messages_since(&chat_ids, since)
            .await
    }

    // -- Streams --

    pub async fn create_stream_marker(&self, stream_id: &str, chat_id: &str) -> Result<()> {
        self.streams.create(stream_id, chat_id).await
    }

    pub async fn get_stream_marker_ids_by_chat_id(&self, chat_id: &str) -> Result<Vec<String>> {
        self.streams.ids_by_chat_id(chat_id).await
    }
}

fn usage_window_start(now: DateTime<Utc>, window_hours: i64) -> DateTime<Utc> {
    now - Duration::hours(window_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_usage_window_boundary() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let since = usage_window_start(now, 24);

        let one_hour_ago = now - Duration::hours(1);
        let twenty_five_hours_ago = now - Duration::hours(25);
        assert!(one_hour_ago >= since);
        assert!(twenty_five_hours_ago < since);
        // A message exactly at the boundary still counts ($gte).
        assert!(now - Duration::hours(24) >= since);
    }
}
