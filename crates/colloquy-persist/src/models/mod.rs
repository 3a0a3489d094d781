mod chat;
mod document;
mod message;
mod stream;
mod user;

pub use chat::{Chat, ChatPage, ChatVisibility};
pub use document::{Document, DocumentKind, Suggestion};
pub use message::{Message, MessageRole, Vote};
pub use stream::StreamMarker;
pub use user::User;
