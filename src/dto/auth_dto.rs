use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::directory_user::DirectoryUser;

#[derive(Debug, Deserialize, Validate)]
pub struct TelegramAuthRequest {
    /// `Telegram.WebApp.initData`, passed through untouched.
    #[validate(length(min = 1, max = 8192))]
    pub init_data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: Option<String>,
}

impl From<&DirectoryUser> for SessionUser {
    fn from(user: &DirectoryUser) -> Self {
        Self {
            id: user.telegram_id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TelegramAuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}
