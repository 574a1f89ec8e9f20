use crate::error::{Error, Result};
use crate::utils::telegram_auth::BotToken;
use dotenvy::dotenv;
use std::env;
use std::fmt;

const DEFAULT_AUTH_RPS: u32 = 20;
const DEFAULT_INIT_DATA_MAX_AGE_SECS: u64 = 86_400;
const DEFAULT_SESSION_TTL_SECS: u64 = 3_600;

#[derive(Clone)]
pub struct Config {
    pub server_address: String,
    pub telegram_bot_token: BotToken,
    pub jwt_secret: String,
    pub auth_rps: u32,
    /// `None` disables the `auth_date` freshness check.
    pub init_data_max_age_secs: Option<u64>,
    pub session_ttl_secs: u64,
    pub webapp_url: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_address", &self.server_address)
            .field("telegram_bot_token", &self.telegram_bot_token)
            .field("jwt_secret", &"<redacted>")
            .field("auth_rps", &self.auth_rps)
            .field("init_data_max_age_secs", &self.init_data_max_age_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("webapp_url", &self.webapp_url)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let telegram_bot_token = BotToken::new(get_env("TELEGRAM_BOT_TOKEN")?).ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN must not be empty".to_string())
        })?;

        let max_age: u64 =
            get_env_parse_or("INIT_DATA_MAX_AGE_SECS", DEFAULT_INIT_DATA_MAX_AGE_SECS)?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            telegram_bot_token,
            jwt_secret: get_env("JWT_SECRET")?,
            auth_rps: get_env_parse_or("AUTH_RPS", DEFAULT_AUTH_RPS)?,
            init_data_max_age_secs: (max_age > 0).then_some(max_age),
            session_ttl_secs: get_env_parse_or("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            webapp_url: env::var("WEBAPP_URL").ok().filter(|url| !url.is_empty()),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            server_address: "127.0.0.1:0".into(),
            telegram_bot_token: BotToken::new("123:SECRET").unwrap(),
            jwt_secret: "jwt-very-secret".into(),
            auth_rps: 5,
            init_data_max_age_secs: Some(60),
            session_ttl_secs: 60,
            webapp_url: None,
        }
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("SECRET"));
        assert!(!rendered.contains("jwt-very-secret"));
        assert!(rendered.contains("127.0.0.1:0"));
    }

    #[test]
    fn parse_or_falls_back_to_default_when_unset() {
        let value: u32 = get_env_parse_or("MINIAPP_AUTH_TEST_SURELY_UNSET", 7).unwrap();
        assert_eq!(value, 7);
    }
}
