use std::path::Path;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::UploadConfig;
use crate::error::DriveupError;

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub file_name: String,
    pub remote_path: String,
    pub status: u16,
}

/// Thin Microsoft Graph client covering the connectivity probe and the
/// single-file upload.
#[derive(Debug, Clone)]
pub struct DriveClient {
    client: reqwest::Client,
    base_url: String,
    folder: String,
}

impl DriveClient {
    pub fn new(client: reqwest::Client, config: &UploadConfig) -> Self {
        Self {
            client,
            base_url: config.graph_base_url.trim_end_matches('/').to_string(),
            folder: config.folder.trim_matches('/').to_string(),
        }
    }

    /// Confirm the token works by fetching the user's drive.
    pub async fn check_connection(&self, access_token: &str) -> Result<(), DriveupError> {
        tracing::info!("checking drive connectivity");
        let url = format!("{}/me/drive", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, bearer(access_token)?)
            .send()
            .await
            .map_err(|e| DriveupError::ProbeFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveupError::ProbeFailed(format!("status {status}: {body}")));
        }
        tracing::info!("drive connection ok");
        Ok(())
    }

    /// Drive-relative path the file will be stored under.
    pub fn remote_path(&self, file_name: &str) -> String {
        if self.folder.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.folder, file_name)
        }
    }

    fn content_url(&self, file_name: &str) -> String {
        let encoded: Vec<String> = self
            .remote_path(file_name)
            .split('/')
            .map(encode_segment)
            .collect();
        format!("{}/me/drive/root:/{}:/content", self.base_url, encoded.join("/"))
    }

    /// PUT the file's bytes into the configured folder, replacing any existing file.
    pub async fn upload(&self, path: &Path, access_token: &str) -> Result<UploadOutcome, DriveupError> {
        tracing::info!(path = %path.display(), "uploading file");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DriveupError::IoError(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("'{}' has no file name", path.display()),
                ))
            })?;
        let bytes = tokio::fs::read(path).await?;

        let resp = self
            .client
            .put(self.content_url(&file_name))
            .header(AUTHORIZATION, bearer(access_token)?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 && status != 201 {
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveupError::UploadFailed {
                file: file_name,
                status,
                body,
            });
        }
        let outcome = UploadOutcome {
            remote_path: self.remote_path(&file_name),
            file_name,
            status,
        };
        tracing::info!(remote_path = %outcome.remote_path, status, "file uploaded");
        Ok(outcome)
    }
}

fn bearer(access_token: &str) -> Result<HeaderValue, DriveupError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|_| {
        DriveupError::ProbeFailed("access token contains invalid header characters".into())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Percent-encode one path segment (RFC 3986 unreserved characters pass through).
fn encode_segment(segment: &str) -> String {
    let mut result = String::with_capacity(segment.len() * 3);
    for b in segment.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(b as char);
            }
            _ => {
                result.push('%');
                result.push_str(&format!("{b:02X}"));
            }
        }
    }
    result
}
