use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Telegram user that has passed the init data check at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}
