use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AuthConfig;
use crate::error::DriveupError;
use crate::oauth::token::TokenRecord;
use crate::transport::FormTransport;

/// Exchanges a refresh token for a new access token.
///
/// Implementations make exactly one attempt. Every failure is reported as
/// [`DriveupError::RefreshRejected`].
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, DriveupError>;
}

/// Refresh-token grant against the configured token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthRefresher {
    transport: Arc<dyn FormTransport>,
    token_endpoint: String,
    client_id: String,
    scopes: String,
}

impl OAuthRefresher {
    pub fn new(transport: Arc<dyn FormTransport>, auth: &AuthConfig) -> Self {
        Self {
            transport,
            token_endpoint: auth.token_endpoint(),
            client_id: auth.client_id.clone(),
            scopes: auth.scopes.clone(),
        }
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, DriveupError> {
        let reply = self
            .transport
            .post_form(
                &self.token_endpoint,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("scope", self.scopes.as_str()),
                ],
            )
            .await
            .map_err(|e| DriveupError::RefreshRejected(format!("request failed: {e}")))?;

        if reply.status != 200 {
            let reason = match reply.oauth_error() {
                Some(err) => match err.error_description {
                    Some(desc) => format!("{} ({})", err.error, desc),
                    None => err.error,
                },
                None => format!("status {}: {}", reply.status, reply.body),
            };
            return Err(DriveupError::RefreshRejected(reason));
        }

        TokenRecord::from_response_body(&reply.body).ok_or_else(|| {
            DriveupError::RefreshRejected("response has no access_token".to_string())
        })
    }
}
