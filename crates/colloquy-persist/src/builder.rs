use crate::client::PersistClient;
use crate::error::{PersistError, Result};

/// Builder for [`PersistClient`], with env-var fallbacks for deployments
/// that configure the store through the environment.
pub struct PersistClientBuilder {
    mongodb_uri: Option<String>,
    database: Option<String>,
}

impl PersistClientBuilder {
    pub fn new() -> Self {
        Self {
            mongodb_uri: None,
            database: None,
        }
    }

    pub fn mongodb_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self
    }

    pub fn database(mut self, db: impl Into<String>) -> Self {
        self.database = Some(db.into());
        self
    }

    pub async fn build(self) -> Result<PersistClient> {
        let mongodb_uri = self
            .mongodb_uri
            .or_else(|| std::env::var("MONGODB_URI").ok())
            .ok_or_else(|| PersistError::BadRequest("mongodb_uri is required".to_string()))?;
        let database = self
            .database
            .or_else(|| std::env::var("MONGODB_DATABASE").ok())
            .ok_or_else(|| PersistError::BadRequest("database is required".to_string()))?;

        PersistClient::connect(&mongodb_uri, &database).await
    }
}

impl Default for PersistClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
