use std::path::{Path, PathBuf};

use crate::error::DriveupError;
use crate::oauth::token::TokenRecord;

/// Durable storage for the single token record.
pub trait TokenStore: Send + Sync {
    /// Load the persisted record. Missing or corrupt storage yields `None`.
    fn load(&self) -> Option<TokenRecord>;

    /// Replace the persisted record.
    fn save(&self, record: &TokenRecord) -> Result<(), DriveupError>;
}

/// Token store backed by one JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_failed(&self, detail: impl std::fmt::Display) -> DriveupError {
        DriveupError::StorageWriteFailed {
            path: self.path.clone(),
            detail: detail.to_string(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "token".to_string());
        self.path
            .with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<TokenRecord> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "token file unreadable, ignoring");
                return None;
            }
        };
        match serde_json::from_str::<TokenRecord>(&data) {
            Ok(mut record) if record.is_usable() => {
                if record.refresh_token.as_deref() == Some("") {
                    record.refresh_token = None;
                }
                Some(record)
            }
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "token file has an empty access token, ignoring");
                None
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "token file is corrupt, ignoring");
                None
            }
        }
    }

    fn save(&self, record: &TokenRecord) -> Result<(), DriveupError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.write_failed(e))?;
            }
        }
        let data = serde_json::to_string_pretty(record).map_err(|e| self.write_failed(e))?;

        // Write next to the target so the rename stays on one filesystem.
        let tmp = self.temp_path();
        if let Err(e) = std::fs::write(&tmp, data) {
            let _ = std::fs::remove_file(&tmp);
            return Err(self.write_failed(e));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)) {
                tracing::debug!(error = %e, "could not restrict token file permissions");
            }
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(self.write_failed(e));
        }
        tracing::debug!(path = %self.path.display(), "token saved");
        Ok(())
    }
}
