use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};
use crate::models::directory_user::DirectoryUser;
use crate::services::user_directory::UserStore;
use crate::utils::telegram_auth::{InitDataVerifier, VerificationOutcome};
use crate::utils::time::from_unix_seconds;
use crate::utils::token::{IssuedSession, SessionKeys};

/// Body of every rejection; the concrete reason stays in the server log.
pub const COULD_NOT_VERIFY: &str = "could_not_verify";

const MAX_CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: DirectoryUser,
    pub session: IssuedSession,
}

#[derive(Clone)]
pub struct AuthService {
    verifier: InitDataVerifier,
    sessions: SessionKeys,
    users: Arc<dyn UserStore>,
    max_age: Option<Duration>,
}

impl AuthService {
    pub fn new(
        verifier: InitDataVerifier,
        sessions: SessionKeys,
        users: Arc<dyn UserStore>,
        max_age_secs: Option<u64>,
    ) -> Self {
        let max_age = max_age_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds);
        Self {
            verifier,
            sessions,
            users,
            max_age,
        }
    }

    pub fn authenticate(&self, init_data: &str, now: DateTime<Utc>) -> Result<AuthenticatedUser> {
        let identity = match self.verifier.verify(init_data) {
            VerificationOutcome::Valid(identity) => identity,
            VerificationOutcome::Invalid(reason) => {
                tracing::warn!(reason = %reason, "Rejected Telegram init data");
                return Err(Error::Unauthorized(COULD_NOT_VERIFY.to_string()));
            }
        };

        if !self.is_fresh(identity.auth_date, now) {
            tracing::warn!(
                user_id = identity.id,
                auth_date = identity.auth_date,
                "Rejected Telegram init data outside the freshness window"
            );
            return Err(Error::Unauthorized(COULD_NOT_VERIFY.to_string()));
        }

        let user = self.users.upsert(&identity, now);
        let session = self.sessions.issue(&identity, now)?;
        tracing::info!(user_id = identity.id, "Telegram user authenticated");

        Ok(AuthenticatedUser { user, session })
    }

    fn is_fresh(&self, auth_date: i64, now: DateTime<Utc>) -> bool {
        let Some(signed_at) = from_unix_seconds(auth_date) else {
            return false;
        };
        if signed_at > now + Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            return false;
        }
        match self.max_age {
            Some(max_age) => now - signed_at <= max_age,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::user_directory::MockUserStore;
    use crate::utils::telegram_auth::{sign_init_data, BotToken};

    const TOKEN: &str = "123:ABC";

    fn service(store: MockUserStore, max_age_secs: Option<u64>) -> AuthService {
        AuthService::new(
            InitDataVerifier::new(BotToken::new(TOKEN).unwrap()),
            SessionKeys::new("jwt-secret", 600),
            Arc::new(store),
            max_age_secs,
        )
    }

    fn init_data(auth_date: i64) -> String {
        sign_init_data(
            &[
                ("auth_date", &auth_date.to_string()),
                ("user", r#"{"id":42,"username":"alice"}"#),
            ],
            TOKEN,
        )
        .unwrap()
    }

    #[test]
    fn valid_init_data_is_upserted_and_gets_a_session() {
        let now = Utc::now();
        let mut store = MockUserStore::new();
        store
            .expect_upsert()
            .withf(|identity, _| identity.id == 42 && identity.username.as_deref() == Some("alice"))
            .times(1)
            .returning(|identity, seen_at| DirectoryUser {
                telegram_id: identity.id,
                username: identity.username.clone(),
                first_seen_at: seen_at,
                last_seen_at: seen_at,
            });

        let svc = service(store, Some(3_600));
        let authed = svc.authenticate(&init_data(now.timestamp() - 10), now).unwrap();
        assert_eq!(authed.user.telegram_id, 42);
        assert!(!authed.session.token.is_empty());
        assert!(authed.session.expires_at > now);
    }

    #[test]
    fn forged_init_data_never_reaches_the_store() {
        let now = Utc::now();
        let mut store = MockUserStore::new();
        store.expect_upsert().times(0);

        let forged = init_data(now.timestamp()).replace("alice", "mallory");
        let err = service(store, None).authenticate(&forged, now).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(msg) if msg == COULD_NOT_VERIFY));
    }

    #[test]
    fn stale_init_data_is_rejected() {
        let now = Utc::now();
        let mut store = MockUserStore::new();
        store.expect_upsert().times(0);

        let err = service(store, Some(60))
            .authenticate(&init_data(now.timestamp() - 3_600), now)
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn init_data_from_the_future_is_rejected() {
        let now = Utc::now();
        let mut store = MockUserStore::new();
        store.expect_upsert().times(0);

        let err = service(store, None)
            .authenticate(&init_data(now.timestamp() + 3_600), now)
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn freshness_window_can_be_disabled() {
        let now = Utc::now();
        let mut store = MockUserStore::new();
        store.expect_upsert().times(1).returning(|identity, seen_at| DirectoryUser {
            telegram_id: identity.id,
            username: identity.username.clone(),
            first_seen_at: seen_at,
            last_seen_at: seen_at,
        });

        let authed = service(store, None)
            .authenticate(&init_data(1_700_000_000), now)
            .unwrap();
        assert_eq!(authed.user.telegram_id, 42);
    }
}
