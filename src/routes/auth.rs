use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    dto::auth_dto::{SessionUser, TelegramAuthRequest, TelegramAuthResponse},
    error::Result,
    utils::time::now,
    AppState,
};

pub async fn telegram_login(
    State(state): State<AppState>,
    Json(payload): Json<TelegramAuthRequest>,
) -> Result<Json<TelegramAuthResponse>> {
    payload.validate()?;

    let authed = state.auth_service.authenticate(&payload.init_data, now())?;

    Ok(Json(TelegramAuthResponse {
        token: authed.session.token,
        expires_at: authed.session.expires_at,
        user: SessionUser::from(&authed.user),
    }))
}
