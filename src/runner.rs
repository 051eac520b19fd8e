use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::config::DriveupConfig;
use crate::drive::{DriveClient, UploadOutcome};
use crate::error::DriveupError;
use crate::oauth::{AcquiredToken, TokenLifecycleManager};
use crate::report::ReportLocator;

/// Sequences the upload: locate report, get a token, probe, upload.
#[derive(Debug)]
pub struct Runner {
    locator: ReportLocator,
    tokens: TokenLifecycleManager,
    drive: DriveClient,
}

impl Runner {
    /// Build a Runner with production components from configuration.
    pub fn from_config(config: &DriveupConfig) -> Result<Self, DriveupError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("driveup/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(
            ReportLocator::new(config.reports.clone()),
            TokenLifecycleManager::from_config(config, client.clone()),
            DriveClient::new(client, &config.upload),
        ))
    }

    pub fn new(locator: ReportLocator, tokens: TokenLifecycleManager, drive: DriveClient) -> Self {
        Self {
            locator,
            tokens,
            drive,
        }
    }

    /// Obtain a valid access token.
    pub async fn authenticate(&self, cancel: &CancellationToken) -> Result<AcquiredToken, DriveupError> {
        let acquired = self.tokens.acquire(cancel).await?;
        tracing::info!(source = %acquired.source, "access token ready");
        Ok(acquired)
    }

    /// Obtain a token and verify it against the drive.
    pub async fn probe(&self, cancel: &CancellationToken) -> Result<AcquiredToken, DriveupError> {
        let acquired = self.authenticate(cancel).await?;
        self.drive.check_connection(&acquired.access_token).await?;
        Ok(acquired)
    }

    /// Upload a specific file.
    pub async fn upload_file(
        &self,
        path: PathBuf,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, DriveupError> {
        if !path.is_file() {
            return Err(DriveupError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
        let acquired = self.probe(cancel).await?;
        self.drive.upload(&path, &acquired.access_token).await
    }

    /// The full process: newest report, token, probe, upload.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<UploadOutcome, DriveupError> {
        tracing::info!("starting upload process");
        let report = self.locator.locate()?;
        let outcome = self.upload_file(report, cancel).await?;
        tracing::info!(file = %outcome.file_name, "process completed successfully");
        Ok(outcome)
    }
}
