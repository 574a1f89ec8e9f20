pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::{
    auth::require_session,
    cors::webapp_cors,
    rate_limit::{rate_limit_middleware, RateLimiter},
};
use crate::services::{
    auth_service::AuthService,
    user_directory::{InMemoryUserStore, UserStore},
};
use crate::utils::{telegram_auth::InitDataVerifier, token::SessionKeys};

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub sessions: SessionKeys,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_store(config, Arc::new(InMemoryUserStore::new()))
    }

    pub fn with_store(config: &Config, users: Arc<dyn UserStore>) -> Self {
        let verifier = InitDataVerifier::new(config.telegram_bot_token.clone());
        let sessions = SessionKeys::new(&config.jwt_secret, config.session_ttl_secs);
        let auth_service = AuthService::new(
            verifier,
            sessions.clone(),
            users.clone(),
            config.init_data_max_age_secs,
        );

        Self {
            auth_service,
            sessions,
            users,
        }
    }
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let auth_api = Router::new()
        .route("/api/auth/telegram", post(routes::auth::telegram_login))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(config.auth_rps),
            rate_limit_middleware,
        ));

    let session_api = Router::new()
        .route("/api/users/me", get(routes::users::current_user))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let public_api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/users", get(routes::users::list_users))
        .route("/api/users/:id", get(routes::users::get_user));

    public_api
        .merge(auth_api)
        .merge(session_api)
        .with_state(state)
        .layer(webapp_cors(config.webapp_url.as_deref()))
        .layer(TraceLayer::new_for_http())
}
