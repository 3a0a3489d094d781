use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel, bson::doc};
use uuid::Uuid;

use crate::error::{MongoErrorContext, Result};
use crate::models::User;

#[derive(Clone, Debug)]
pub struct UserRepository {
    collection: Collection<User>,
}

impl UserRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("users");
        Self { collection }
    }

    /// Find users by email. The unique index makes 0 or 1 the expected
    /// cardinality; callers treat the result as at-most-one.
    pub async fn get_by_email(&self, email: &str) -> Result<Vec<User>> {
        let users = self
            .collection
            .find(doc! { "email": email })
            .await
            .op_context("Failed to get user by email")?
            .try_collect()
            .await
            .op_context("Failed to get user by email")?;
        Ok(users)
    }

    /// Create a user with a caller-supplied (already hashed) credential.
    pub async fn create(&self, email: &str, password_hash: &str) -> Result<()> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password_hash.to_string(),
        };
        self.collection
            .insert_one(&user)
            .await
            .op_context("Failed to create user")?;
        Ok(())
    }

    /// Create a guest account with a generated email and a random throwaway
    /// credential that can never be logged in with directly.
    pub async fn create_guest(&self) -> Result<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: format!("guest-{}", Utc::now().timestamp_millis()),
            password: Uuid::new_v4().to_string(),
        };
        self.collection
            .insert_one(&user)
            .await
            .op_context("Failed to create guest user")?;
        Ok(user)
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection
            .create_index(index)
            .await
            .op_context("Failed to create unique index on users.email")?;
        Ok(())
    }
}
