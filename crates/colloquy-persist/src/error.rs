use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("{context}: {source}")]
    Database {
        context: String,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;

/// Extension trait attaching an operation description to driver errors.
///
/// Every store-facing call goes through this, so no raw
/// `mongodb::error::Error` ever escapes the crate boundary.
pub(crate) trait MongoErrorContext<T> {
    fn op_context(self, context: &str) -> Result<T>;
}

impl<T> MongoErrorContext<T> for std::result::Result<T, mongodb::error::Error> {
    fn op_context(self, context: &str) -> Result<T> {
        self.map_err(|e| PersistError::Database {
            context: context.to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinguishable() {
        let not_found = PersistError::NotFound("Chat with id abc not found".to_string());
        let bad_request = PersistError::BadRequest("page size must be positive".to_string());

        assert!(matches!(&not_found, PersistError::NotFound(_)));
        assert!(matches!(&bad_request, PersistError::BadRequest(_)));
        assert_eq!(
            not_found.to_string(),
            "Not found: Chat with id abc not found"
        );
        assert_eq!(bad_request.to_string(), "Bad request: page size must be positive");
    }
}
