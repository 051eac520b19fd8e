use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CLIENT_ID: &str = "6a9129b2-81b0-4d0d-915f-60c232db9fe2";
pub const DEFAULT_TENANT: &str = "common";
pub const DEFAULT_SCOPES: &str = "offline_access Files.ReadWrite.All User.Read";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveupConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    #[serde(default)]
    pub reports: ReportConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    /// Append-mode log file; `null` disables file logging.
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,
}

impl Default for DriveupConfig {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            token_file: default_token_file(),
            reports: ReportConfig::default(),
            upload: UploadConfig::default(),
            log_file: default_log_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_tenant")]
    pub tenant: String,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_authority")]
    pub authority: String,
    #[serde(default)]
    pub open_browser: bool,
    /// Stop polling on the client side once the device code's `expires_in` has passed.
    #[serde(default)]
    pub enforce_device_code_expiry: bool,
    /// Skip the refresh exchange while the cached access token is still fresh.
    #[serde(default)]
    pub reuse_unexpired_access_token: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            tenant: default_tenant(),
            scopes: default_scopes(),
            authority: default_authority(),
            open_browser: false,
            enforce_device_code_expiry: false,
            reuse_unexpired_access_token: false,
        }
    }
}

impl AuthConfig {
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.tenant
        )
    }

    pub fn device_code_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/devicecode",
            self.authority.trim_end_matches('/'),
            self.tenant
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    #[serde(default = "default_search_dirs")]
    pub search_dirs: Vec<PathBuf>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            search_dirs: default_search_dirs(),
            prefix: default_prefix(),
            extension: default_extension(),
            date_format: default_date_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    /// Destination folder below the drive root, `/`-separated.
    #[serde(default = "default_folder")]
    pub folder: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            graph_base_url: default_graph_base_url(),
            folder: default_folder(),
        }
    }
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token_data.json")
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("upload_debug.log"))
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_tenant() -> String {
    DEFAULT_TENANT.to_string()
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_string()
}

fn default_authority() -> String {
    DEFAULT_AUTHORITY.to_string()
}

fn default_search_dirs() -> Vec<PathBuf> {
    ["./Data/input", "./Data", "./RPA", "./input", "./Reportes"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

fn default_prefix() -> String {
    "Reporte_".to_string()
}

fn default_extension() -> String {
    "xlsx".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_graph_base_url() -> String {
    DEFAULT_GRAPH_BASE_URL.to_string()
}

fn default_folder() -> String {
    "RPA/Reportes".to_string()
}
