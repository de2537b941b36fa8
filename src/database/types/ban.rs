use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per banned user, written by the same operation that flips the
/// `banned` flag on the user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanRecord {
    pub user_id: i64,
    pub banned_at: DateTime<Utc>,
    pub reason: String,
}
