use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The authenticated principal carried by a bearer token, used by RBAC's
/// `owner` resolution and by `$userId` special-field substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: Option<Value>,
    pub username: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct TokenRecord {
    pub subject: Subject,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
