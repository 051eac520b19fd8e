use async_trait::async_trait;

use crate::error::DriveupError;

/// Status and body of an HTTP response, read to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The OAuth `error` code, when the body is a JSON error object.
    pub fn oauth_error(&self) -> Option<OAuthErrorBody> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Error body returned by the token and device-code endpoints.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl std::fmt::Debug for dyn FormTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormTransport").finish()
    }
}

/// The one HTTP operation the OAuth endpoints need.
#[async_trait]
pub trait FormTransport: Send + Sync {
    /// POST a form-encoded body and return the full response.
    ///
    /// Any status code is a successful reply; only transport failures are errors.
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpReply, DriveupError>;
}

/// `FormTransport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FormTransport for ReqwestTransport {
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpReply, DriveupError> {
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpReply { status, body })
    }
}
