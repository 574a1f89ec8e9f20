use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    error::{Error, Result},
    models::directory_user::DirectoryUser,
    utils::token::Claims,
    AppState,
};

pub async fn list_users(State(state): State<AppState>) -> Json<Vec<DirectoryUser>> {
    Json(state.users.list())
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> Result<Json<DirectoryUser>> {
    state
        .users
        .get(telegram_id)
        .map(Json)
        .ok_or_else(|| Error::NotFound("user_not_found".into()))
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DirectoryUser>> {
    let telegram_id = claims
        .telegram_id()
        .ok_or_else(|| Error::Unauthorized("invalid_token".into()))?;
    state
        .users
        .get(telegram_id)
        .map(Json)
        .ok_or_else(|| Error::NotFound("user_not_found".into()))
}
