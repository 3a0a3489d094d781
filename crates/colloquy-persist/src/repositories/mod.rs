mod chat;
mod document;
mod message;
mod stream;
mod suggestion;
mod user;
mod vote;

pub use chat::ChatRepository;
pub use document::DocumentRepository;
pub use message::MessageRepository;
pub use stream::StreamRepository;
pub use suggestion::SuggestionRepository;
pub use user::UserRepository;
pub use vote::VoteRepository;
