use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::telegram_auth::VerifiedIdentity;

const MAX_SESSION_TTL_SECS: u64 = 30 * 24 * 3_600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Telegram user id.
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub username: Option<String>,
}

impl Claims {
    pub fn telegram_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 keys for the session tokens handed out after a successful init data check.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let ttl_secs = ttl_secs.clamp(1, MAX_SESSION_TTL_SECS) as i64;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn issue(&self, identity: &VerifiedIdentity, now: DateTime<Utc>) -> Result<IssuedSession> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: identity.id.to_string(),
            iat: unix_usize(now)?,
            exp: unix_usize(expires_at)?,
            username: identity.username.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedSession { token, expires_at })
    }

    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

fn unix_usize(at: DateTime<Utc>) -> Result<usize> {
    usize::try_from(at.timestamp())
        .map_err(|_| Error::Internal("timestamp before unix epoch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity {
            id: 42,
            username: Some("alice".into()),
            auth_date: 1_700_000_000,
        }
    }

    #[test]
    fn issued_token_decodes_to_same_identity() {
        let keys = SessionKeys::new("secret", 600);
        let now = Utc::now();
        let session = keys.issue(&identity(), now).unwrap();
        assert_eq!(session.expires_at, now + Duration::seconds(600));

        let claims = keys.decode(&session.token).unwrap();
        assert_eq!(claims.telegram_id(), Some(42));
        assert_eq!(claims.username.as_deref(), Some("alice"));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issued = SessionKeys::new("secret-a", 600)
            .issue(&identity(), Utc::now())
            .unwrap();
        let err = SessionKeys::new("secret-b", 600).decode(&issued.token).unwrap_err();
        assert!(matches!(err, Error::Jwt(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new("secret", 60);
        let issued = keys
            .issue(&identity(), Utc::now() - Duration::hours(2))
            .unwrap();
        assert!(keys.decode(&issued.token).is_err());
    }
}
