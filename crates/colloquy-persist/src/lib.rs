pub mod builder;
pub mod client;
pub mod error;
pub mod models;
pub mod repositories;

pub use builder::PersistClientBuilder;
pub use client::PersistClient;
pub use error::{PersistError, Result};
pub use models::{
    Chat, ChatPage, ChatVisibility, Document, DocumentKind, Message, MessageRole, StreamMarker,
    Suggestion, User, Vote,
};
