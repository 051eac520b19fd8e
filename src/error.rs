use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DriveupError {
    #[error("Could not persist token to {}: {detail}", path.display())]
    StorageWriteFailed { path: PathBuf, detail: String },

    #[error("Token refresh rejected: {0}")]
    RefreshRejected(String),

    #[error("Device authorization returned a malformed response: {0}")]
    DeviceFlowMalformedResponse(String),

    #[error("{}", format_denied(.code, .description.as_deref()))]
    DeviceFlowDenied {
        code: String,
        description: Option<String>,
    },

    #[error("Device code expired before the login was approved")]
    DeviceFlowExpired,

    #[error("Device authorization request failed: {0}")]
    DeviceFlowNetworkError(String),

    #[error("Device authorization got unexpected status {status}: {body}")]
    DeviceFlowUnexpectedStatus { status: u16, body: String },

    #[error("Authorization cancelled")]
    Cancelled,

    #[error("Connectivity check failed: {0}")]
    ProbeFailed(String),

    #[error("Upload of '{file}' failed with status {status}: {body}")]
    UploadFailed {
        file: String,
        status: u16,
        body: String,
    },

    #[error("No report matching '{pattern}' found in any search directory")]
    NoReportFound { pattern: String },

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn format_denied(code: &str, description: Option<&str>) -> String {
    match description {
        Some(d) => format!("Device authorization denied ({code}): {d}"),
        None => format!("Device authorization denied ({code})"),
    }
}

impl DriveupError {
    /// Stable error code string for logs and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            DriveupError::StorageWriteFailed { .. } => "storage_write_failed",
            DriveupError::RefreshRejected(_) => "refresh_rejected",
            DriveupError::DeviceFlowMalformedResponse(_) => "device_flow_malformed_response",
            DriveupError::DeviceFlowDenied { .. } => "device_flow_denied",
            DriveupError::DeviceFlowExpired => "device_flow_expired",
            DriveupError::DeviceFlowNetworkError(_) => "device_flow_network_error",
            DriveupError::DeviceFlowUnexpectedStatus { .. } => "device_flow_unexpected_status",
            DriveupError::Cancelled => "cancelled",
            DriveupError::ProbeFailed(_) => "probe_failed",
            DriveupError::UploadFailed { .. } => "upload_failed",
            DriveupError::NoReportFound { .. } => "no_report_found",
            DriveupError::ConfigError { .. } => "config_error",
            DriveupError::HttpError(_) => "http_error",
            DriveupError::IoError(_) => "io_error",
        }
    }

    /// True for the errors that end an interactive authorization attempt.
    ///
    /// None of these has a further fallback, so they abort the current run.
    pub fn is_terminal_auth_failure(&self) -> bool {
        matches!(
            self,
            DriveupError::DeviceFlowMalformedResponse(_)
                | DriveupError::DeviceFlowDenied { .. }
                | DriveupError::DeviceFlowExpired
                | DriveupError::DeviceFlowNetworkError(_)
                | DriveupError::DeviceFlowUnexpectedStatus { .. }
                | DriveupError::Cancelled
        )
    }

    /// Produce a structured JSON error object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }
}
