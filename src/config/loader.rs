use std::path::{Path, PathBuf};

use crate::error::DriveupError;

use super::types::DriveupConfig;

/// Find the config file to use, highest precedence first.
///
/// Precedence:
/// 1. `--config` CLI flag (must exist)
/// 2. `DRIVEUP_CONFIG` env var (must exist)
/// 3. `./config/driveup.json` (project-level)
/// 4. `~/.driveup/driveup.json` (home-level)
///
/// Returns `Ok(None)` when nothing is found, in which case defaults apply.
pub fn discover_config_file(cli_config: Option<&Path>) -> Result<Option<PathBuf>, DriveupError> {
    if let Some(path) = cli_config {
        return require_existing(path).map(Some);
    }

    if let Ok(env_path) = std::env::var("DRIVEUP_CONFIG") {
        if !env_path.is_empty() {
            return require_existing(Path::new(&env_path)).map(Some);
        }
    }

    let project_config = PathBuf::from("./config/driveup.json");
    if project_config.exists() {
        return Ok(Some(project_config));
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".driveup").join("driveup.json");
        if home_config.exists() {
            return Ok(Some(home_config));
        }
    }

    Ok(None)
}

fn require_existing(path: &Path) -> Result<PathBuf, DriveupError> {
    if path.exists() {
        Ok(path.to_path_buf())
    } else {
        Err(DriveupError::ConfigError {
            path: path.to_path_buf(),
            detail: "File does not exist".into(),
        })
    }
}

fn load_config_file(path: &Path) -> Result<DriveupConfig, DriveupError> {
    let content = std::fs::read_to_string(path).map_err(|e| DriveupError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {e}"),
    })?;

    serde_json::from_str::<DriveupConfig>(&content).map_err(|e| DriveupError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Invalid JSON: {e}"),
    })
}

/// Apply `DRIVEUP_*` overrides. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut DriveupConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(client_id) = get("DRIVEUP_CLIENT_ID") {
        config.auth.client_id = client_id;
    }
    if let Some(tenant) = get("DRIVEUP_TENANT") {
        config.auth.tenant = tenant;
    }
    if let Some(token_file) = get("DRIVEUP_TOKEN_FILE") {
        config.token_file = PathBuf::from(token_file);
    }
}

/// Load the effective configuration.
///
/// Returns the config together with the file it came from, if any.
pub fn load_config(
    cli_config: Option<&Path>,
) -> Result<(DriveupConfig, Option<PathBuf>), DriveupError> {
    let source = discover_config_file(cli_config)?;
    let mut config = match &source {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_config_file(path)?
        }
        None => {
            tracing::debug!("no config file found, using defaults");
            DriveupConfig::default()
        }
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok((config, source))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = discover_config_file(Some(Path::new("/nonexistent/driveup.json"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn explicit_config_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driveup.json");
        std::fs::write(&path, "{}").unwrap();
        let found = discover_config_file(Some(&path)).unwrap();
        assert_eq!(found, Some(path));
    }

    #[test]
    fn load_config_file_parses_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driveup.json");
        std::fs::write(
            &path,
            r#"{
  "tokenFile": "/var/lib/driveup/token.json",
  "upload": { "folder": "Shared/Daily" }
}"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.token_file, PathBuf::from("/var/lib/driveup/token.json"));
        assert_eq!(config.upload.folder, "Shared/Daily");
    }

    #[test]
    fn load_config_file_error_on_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not valid json at all").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn load_config_file_error_on_missing_file() {
        let err = load_config_file(Path::new("/nonexistent/file.json")).unwrap_err();
        assert!(err.to_string().contains("Cannot read file"));
    }

    #[test]
    fn env_overrides_replace_values() {
        let vars: HashMap<&str, &str> = [
            ("DRIVEUP_CLIENT_ID", "my-app"),
            ("DRIVEUP_TENANT", "organizations"),
            ("DRIVEUP_TOKEN_FILE", "/tmp/t.json"),
        ]
        .into_iter()
        .collect();
        let mut config = DriveupConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.auth.client_id, "my-app");
        assert_eq!(config.auth.tenant, "organizations");
        assert_eq!(config.token_file, PathBuf::from("/tmp/t.json"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = DriveupConfig::default();
        apply_env_overrides(&mut config, |k| {
            (k == "DRIVEUP_TENANT").then(|| String::new())
        });
        assert_eq!(config.auth.tenant, "common");
    }
}
