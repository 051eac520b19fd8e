use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Tokens older than `expires_in` minus this margin are treated as stale.
const EXPIRY_SKEW_SECS: i64 = 300;

/// The single persisted credential record.
///
/// Only `access_token` and `refresh_token` are interpreted. Every other field
/// the authorization server returned (`expires_in`, `scope`, `token_type`, ...)
/// is carried in `raw_fields` and written back unchanged.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obtained_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub raw_fields: serde_json::Map<String, serde_json::Value>,
}

impl TokenRecord {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            obtained_at: None,
            raw_fields: serde_json::Map::new(),
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Parse a successful token endpoint body.
    ///
    /// Returns `None` when the body is not a JSON object or lacks a non-empty
    /// `access_token`. An empty `refresh_token` counts as absent.
    pub fn from_response_body(body: &str) -> Option<Self> {
        let mut record: TokenRecord = serde_json::from_str(body).ok()?;
        if !record.is_usable() {
            return None;
        }
        if record.refresh_token.as_deref() == Some("") {
            record.refresh_token = None;
        }
        record.obtained_at = Some(Utc::now());
        Some(record)
    }

    /// Keep `previous` as the refresh token when the server did not rotate it.
    pub fn retain_refresh_token(&mut self, previous: &str) {
        if self.refresh_token.is_none() {
            self.refresh_token = Some(previous.to_string());
        }
    }

    /// Lifetime in seconds as reported by the server, if present.
    pub fn expires_in(&self) -> Option<i64> {
        match self.raw_fields.get("expires_in")? {
            serde_json::Value::Number(n) => n.as_i64(),
            // Some endpoints send numbers as strings.
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.obtained_at?
            .checked_add_signed(TimeDelta::try_seconds(self.expires_in()?)?)
    }

    /// True when the access token is known to stay valid for a few more minutes.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let Some(expires) = self.expires_at() else {
            return false;
        };
        match now.checked_add_signed(TimeDelta::seconds(EXPIRY_SKEW_SECS)) {
            Some(deadline) => self.is_usable() && deadline < expires,
            None => false,
        }
    }
}
