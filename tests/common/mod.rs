pub mod oauth_mock;

use std::path::{Path, PathBuf};

use driveup::config::{AuthConfig, ReportConfig, UploadConfig};
use driveup::DriveupConfig;

/// Config whose OAuth authority and Graph base URL both point at `server_uri`.
#[allow(dead_code)]
pub fn mock_config(server_uri: &str, dir: &Path) -> DriveupConfig {
    DriveupConfig {
        auth: AuthConfig {
            authority: server_uri.to_string(),
            client_id: "test-client".into(),
            ..AuthConfig::default()
        },
        token_file: dir.join("token_data.json"),
        reports: ReportConfig {
            search_dirs: vec![dir.join("Data")],
            ..ReportConfig::default()
        },
        upload: UploadConfig {
            graph_base_url: server_uri.to_string(),
            folder: "RPA/Reportes".into(),
        },
        log_file: None,
    }
}

/// Write a token file the way a previous run would have left it.
#[allow(dead_code)]
pub fn seed_token_file(path: &Path, access: &str, refresh: Option<&str>) -> String {
    let mut value = serde_json::json!({
        "token_type": "Bearer",
        "scope": "Files.ReadWrite.All User.Read",
        "expires_in": 3599,
        "access_token": access,
    });
    if let Some(refresh) = refresh {
        value["refresh_token"] = serde_json::Value::String(refresh.to_string());
    }
    let contents = serde_json::to_string_pretty(&value).unwrap();
    std::fs::write(path, &contents).unwrap();
    contents
}

/// Create `dir/Data/<name>` with some bytes and return its path.
#[allow(dead_code)]
pub fn write_report(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let data = dir.join("Data");
    std::fs::create_dir_all(&data).unwrap();
    let path = data.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Write a driveup.json into `dir` and return its path.
#[allow(dead_code)]
pub fn write_config_file(dir: &Path, config: &DriveupConfig) -> PathBuf {
    let path = dir.join("driveup.json");
    std::fs::write(&path, serde_json::to_string_pretty(config).unwrap()).unwrap();
    path
}
