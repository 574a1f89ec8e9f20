use std::collections::HashSet;
use std::fmt;

use hmac::{digest::InvalidLength, Hmac, Mac};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// HMAC key used to derive the per-bot secret from the bot token.
const WEB_APP_DATA: &[u8] = b"WebAppData";
const HASH_FIELD: &str = "hash";

/// Secret token issued by BotFather. Its `Debug` output is redacted.
#[derive(Clone)]
pub struct BotToken(String);

impl BotToken {
    /// Returns `None` for an empty or blank token.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    pub id: i64,
    pub username: Option<String>,
    /// Unix seconds, as signed by Telegram.
    pub auth_date: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingHash,
    MalformedPayload,
    SignatureMismatch,
    InternalCryptoError,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingHash => "missing_hash",
            RejectReason::MalformedPayload => "malformed_payload",
            RejectReason::SignatureMismatch => "signature_mismatch",
            RejectReason::InternalCryptoError => "internal_crypto_error",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Valid(VerifiedIdentity),
    Invalid(RejectReason),
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid(_))
    }

    pub fn into_identity(self) -> Option<VerifiedIdentity> {
        match self {
            VerificationOutcome::Valid(identity) => Some(identity),
            VerificationOutcome::Invalid(_) => None,
        }
    }
}

/// Checks Mini-App init data against the bot token it was created for.
#[derive(Debug, Clone)]
pub struct InitDataVerifier {
    bot_token: BotToken,
}

impl InitDataVerifier {
    pub fn new(bot_token: BotToken) -> Self {
        Self { bot_token }
    }

    pub fn verify(&self, raw_init_data: &str) -> VerificationOutcome {
        verify_telegram_data(raw_init_data, self.bot_token.expose())
    }
}

pub fn verify_telegram_data(init_data: &str, bot_token: &str) -> VerificationOutcome {
    let outcome = check_init_data(init_data, bot_token);
    match &outcome {
        VerificationOutcome::Valid(identity) => {
            tracing::debug!(valid = true, user_id = identity.id, "init data verified");
        }
        VerificationOutcome::Invalid(RejectReason::InternalCryptoError) => {
            tracing::error!(valid = false, "init data verification failed in HMAC primitive");
        }
        VerificationOutcome::Invalid(reason) => {
            tracing::debug!(valid = false, reason = %reason, "init data rejected");
        }
    }
    outcome
}

fn check_init_data(init_data: &str, bot_token: &str) -> VerificationOutcome {
    use VerificationOutcome::Invalid;

    let Some(mut pairs) = parse_init_data(init_data) else {
        return Invalid(RejectReason::MalformedPayload);
    };
    let Some(hash_pos) = pairs.iter().position(|(key, _)| key == HASH_FIELD) else {
        return Invalid(RejectReason::MissingHash);
    };
    let (_, provided_hash) = pairs.remove(hash_pos);

    if bot_token.is_empty() {
        return Invalid(RejectReason::InternalCryptoError);
    }
    let Ok(expected_hash) = sign_payload(&data_check_string(&pairs), bot_token) else {
        return Invalid(RejectReason::InternalCryptoError);
    };
    if !hashes_match(&expected_hash, &provided_hash) {
        return Invalid(RejectReason::SignatureMismatch);
    }

    match identity_from_pairs(&pairs) {
        Some(identity) => VerificationOutcome::Valid(identity),
        None => Invalid(RejectReason::MalformedPayload),
    }
}

/// Decodes a query string into key/value pairs, keeping input order.
/// Returns `None` for anything that is not a well-formed, duplicate-free query.
fn parse_init_data(raw: &str) -> Option<Vec<(String, String)>> {
    if raw
        .bytes()
        .any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
    {
        return None;
    }

    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for segment in raw.split('&').filter(|s| !s.is_empty()) {
        let (raw_key, raw_value) = segment.split_once('=')?;
        let key = decode_component(raw_key)?;
        let value = decode_component(raw_value)?;
        if key.is_empty() || !seen.insert(key.clone()) {
            return None;
        }
        pairs.push((key, value));
    }

    if pairs.is_empty() {
        None
    } else {
        Some(pairs)
    }
}

/// Form decoding (`+` is a space) that fails on invalid UTF-8 instead of
/// substituting U+FFFD.
fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Sorted `key=value` lines joined with `\n`, the exact message Telegram signs.
pub fn data_check_string(pairs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn sign_payload(data_check_string: &str, bot_token: &str) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(WEB_APP_DATA)?;
    mac.update(bot_token.as_bytes());
    let secret_key = mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key)?;
    mac.update(data_check_string.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn hashes_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[derive(Deserialize)]
struct InitDataUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

fn identity_from_pairs(pairs: &[(String, String)]) -> Option<VerifiedIdentity> {
    let field = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    let user: InitDataUser = serde_json::from_str(field("user")?).ok()?;
    let auth_date = field("auth_date")?.parse::<i64>().ok()?;
    Some(VerifiedIdentity {
        id: user.id,
        username: user.username,
        auth_date,
    })
}

/// Produces a signed init data query string the way the Telegram client
/// would, with `hash` appended last.
pub fn sign_init_data(pairs: &[(&str, &str)], bot_token: &str) -> Result<String, InvalidLength> {
    let owned: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hash = sign_payload(&data_check_string(&owned), bot_token)?;

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.append_pair(HASH_FIELD, &hash);
    Ok(serializer.finish())
}
