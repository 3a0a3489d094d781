use serde::{Deserialize, Serialize};

/// A registered or guest account.
///
/// `password` holds a pre-hashed credential; hashing happens upstream of
/// this crate. `id` is the application-level identifier, distinct from the
/// driver-assigned `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub password: String,
}
