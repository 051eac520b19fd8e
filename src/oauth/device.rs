//! OAuth 2.0 device authorization grant (RFC 8628).
//!
//! The operator approves the login on another device while this process polls
//! the token endpoint. Polling waits `interval` seconds between attempts and
//! stops on success, on a terminal error code, or when the caller's
//! [`CancellationToken`] fires.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;
use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::AuthConfig;
use crate::error::DriveupError;
use crate::oauth::token::TokenRecord;
use crate::transport::{FormTransport, HttpReply};

pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Used when the device-code response carries no `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 900;

/// One in-flight device authorization attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAuthorizationSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub poll_interval_seconds: u64,
    pub expires_in_seconds: u64,
    /// Human-readable instructions supplied by the server, if any.
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: Option<String>,
    user_code: Option<String>,
    verification_uri: Option<String>,
    interval: Option<u64>,
    expires_in: Option<u64>,
    message: Option<String>,
}

impl DeviceCodeResponse {
    fn into_session(self) -> Result<DeviceAuthorizationSession, DriveupError> {
        let mut missing = Vec::new();
        let device_code = non_empty(self.device_code, "device_code", &mut missing);
        let user_code = non_empty(self.user_code, "user_code", &mut missing);
        let verification_uri = non_empty(self.verification_uri, "verification_uri", &mut missing);
        if self.interval.is_none() {
            missing.push("interval");
        }
        match (device_code, user_code, verification_uri, self.interval) {
            (Some(device_code), Some(user_code), Some(verification_uri), Some(interval)) => {
                Ok(DeviceAuthorizationSession {
                    device_code,
                    user_code,
                    verification_uri,
                    poll_interval_seconds: interval,
                    expires_in_seconds: self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
                    message: self.message,
                })
            }
            _ => Err(DriveupError::DeviceFlowMalformedResponse(format!(
                "malformed device response: missing {}",
                missing.join(", ")
            ))),
        }
    }
}

fn non_empty(
    value: Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name);
            None
        }
    }
}

/// Interactive authorization strategy used when no refresh is possible.
#[async_trait]
pub trait DeviceAuthorizer: Send + Sync {
    /// Run one full authorization attempt.
    async fn authorize(&self, cancel: &CancellationToken) -> Result<TokenRecord, DriveupError>;
}

/// Outcome of a single poll of the token endpoint.
#[derive(Debug)]
enum PollStep {
    Pending,
    Finished(Result<TokenRecord, DriveupError>),
}

/// Device-code grant against the configured authority.
#[derive(Debug, Clone)]
pub struct DeviceCodeAuthorizer {
    transport: Arc<dyn FormTransport>,
    device_code_endpoint: String,
    token_endpoint: String,
    client_id: String,
    scopes: String,
    open_browser: bool,
    enforce_expiry: bool,
}

impl DeviceCodeAuthorizer {
    pub fn new(transport: Arc<dyn FormTransport>, auth: &AuthConfig) -> Self {
        Self {
            transport,
            device_code_endpoint: auth.device_code_endpoint(),
            token_endpoint: auth.token_endpoint(),
            client_id: auth.client_id.clone(),
            scopes: auth.scopes.clone(),
            open_browser: auth.open_browser,
            enforce_expiry: auth.enforce_device_code_expiry,
        }
    }

    /// Request a device code and user code.
    pub async fn start_session(&self) -> Result<DeviceAuthorizationSession, DriveupError> {
        let reply = self
            .transport
            .post_form(
                &self.device_code_endpoint,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("scope", self.scopes.as_str()),
                ],
            )
            .await
            .map_err(|e| DriveupError::DeviceFlowNetworkError(e.to_string()))?;

        if !(200..300).contains(&reply.status) {
            return Err(DriveupError::DeviceFlowUnexpectedStatus {
                status: reply.status,
                body: reply.body,
            });
        }

        let payload: DeviceCodeResponse = serde_json::from_str(&reply.body).map_err(|e| {
            DriveupError::DeviceFlowMalformedResponse(format!("malformed device response: {e}"))
        })?;
        payload.into_session()
    }

    /// Show the operator where to go and which code to enter.
    pub fn display_challenge(&self, session: &DeviceAuthorizationSession) {
        eprintln!();
        eprintln!("{}", "Authorize access here:".bold());
        eprintln!("  {}", session.verification_uri.cyan().underline());
        eprintln!("  Code: {}", session.user_code.yellow().bold());
        eprintln!();
        tracing::info!(
            verification_uri = %session.verification_uri,
            user_code = %session.user_code,
            expires_in = session.expires_in_seconds,
            "waiting for device authorization"
        );
        if let Some(message) = &session.message {
            tracing::debug!("{message}");
        }

        if self.open_browser && webbrowser::open(&session.verification_uri).is_err() {
            tracing::warn!(
                "Could not open browser automatically. Please visit {}",
                session.verification_uri
            );
        }
    }

    /// Poll the token endpoint until the login is approved or fails.
    pub async fn poll_for_token(
        &self,
        session: &DeviceAuthorizationSession,
        cancel: &CancellationToken,
    ) -> Result<TokenRecord, DriveupError> {
        let interval = Duration::from_secs(session.poll_interval_seconds);
        // A window too large to represent is no window at all.
        let deadline = if self.enforce_expiry {
            Instant::now().checked_add(Duration::from_secs(session.expires_in_seconds))
        } else {
            None
        };
        let form = [
            ("client_id", self.client_id.as_str()),
            ("scope", self.scopes.as_str()),
            ("grant_type", DEVICE_CODE_GRANT),
            ("device_code", session.device_code.as_str()),
        ];

        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(DriveupError::Cancelled);
            }
            if attempt > 0 {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(DriveupError::Cancelled),
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            attempt += 1;

            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::debug!(attempt, "device code validity window elapsed");
                return Err(DriveupError::DeviceFlowExpired);
            }

            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DriveupError::Cancelled),
                reply = self.transport.post_form(&self.token_endpoint, &form) => reply,
            };
            let reply = reply.map_err(|e| DriveupError::DeviceFlowNetworkError(e.to_string()))?;

            match interpret_poll_reply(reply) {
                PollStep::Pending => {
                    tracing::debug!(attempt, "authorization pending");
                }
                PollStep::Finished(result) => {
                    tracing::debug!(attempt, ok = result.is_ok(), "device polling finished");
                    return result;
                }
            }
        }
    }
}

fn interpret_poll_reply(reply: HttpReply) -> PollStep {
    match reply.status {
        200 => PollStep::Finished(TokenRecord::from_response_body(&reply.body).ok_or_else(|| {
            DriveupError::DeviceFlowMalformedResponse(
                "token response has no access_token".to_string(),
            )
        })),
        400 => match reply.oauth_error() {
            Some(err) if err.error == "authorization_pending" => PollStep::Pending,
            Some(err) if err.error == "expired_token" => {
                PollStep::Finished(Err(DriveupError::DeviceFlowExpired))
            }
            Some(err) => PollStep::Finished(Err(DriveupError::DeviceFlowDenied {
                code: err.error,
                description: err.error_description,
            })),
            None => PollStep::Finished(Err(DriveupError::DeviceFlowUnexpectedStatus {
                status: reply.status,
                body: reply.body,
            })),
        },
        status => PollStep::Finished(Err(DriveupError::DeviceFlowUnexpectedStatus {
            status,
            body: reply.body,
        })),
    }
}

#[async_trait]
impl DeviceAuthorizer for DeviceCodeAuthorizer {
    async fn authorize(&self, cancel: &CancellationToken) -> Result<TokenRecord, DriveupError> {
        tracing::info!("starting device code authorization");
        let session = self.start_session().await?;
        self.display_challenge(&session);
        let record = self.poll_for_token(&session, cancel).await?;
        tracing::info!("device authorization completed");
        Ok(record)
    }
}
