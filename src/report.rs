//! Locating the report to upload.
//!
//! Reports are named `{prefix}{date}.{extension}`, e.g. `Reporte_2024-05-31.xlsx`.
//! The newest one by embedded date wins.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::ReportConfig;
use crate::error::DriveupError;

/// Prefix Office uses for lock files next to an open document.
const LOCK_FILE_PREFIX: &str = "~$";

#[derive(Debug, Clone)]
pub struct ReportLocator {
    config: ReportConfig,
}

impl ReportLocator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Human-readable form of the naming convention, for messages.
    pub fn pattern(&self) -> String {
        format!("{}*.{}", self.config.prefix, self.config.extension)
    }

    /// Every file with the configured extension in the search directories.
    ///
    /// Directories are scanned in order and not recursed into. Missing or
    /// unreadable directories are skipped.
    pub fn find_candidates(&self) -> Vec<PathBuf> {
        tracing::info!(extension = %self.config.extension, "searching for report files");
        let mut found = Vec::new();
        for dir in &self.config.search_dirs {
            let mut hits = self.scan_dir(dir);
            if !hits.is_empty() {
                hits.sort();
                tracing::info!(dir = %dir.display(), files = ?hits, "found candidates");
                found.extend(hits);
            }
        }
        found
    }

    fn scan_dir(&self, dir: &Path) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping search directory");
                return Vec::new();
            }
        };
        let suffix = format!(".{}", self.config.extension);
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .filter(|path| {
                file_name(path)
                    .is_some_and(|name| name.ends_with(&suffix) && !name.starts_with(LOCK_FILE_PREFIX))
            })
            .collect()
    }

    /// Date embedded in a report file name, if it follows the convention.
    pub fn report_date(&self, path: &Path) -> Option<NaiveDate> {
        let name = file_name(path)?;
        let stem = name
            .strip_prefix(&self.config.prefix)?
            .strip_suffix(&format!(".{}", self.config.extension))?;
        NaiveDate::parse_from_str(stem, &self.config.date_format).ok()
    }

    /// Pick the newest report among `candidates`.
    ///
    /// Only names starting with the prefix are considered. Names whose date
    /// does not parse rank below every dated report. On ties the earlier
    /// candidate wins.
    pub fn select_latest(&self, candidates: &[PathBuf]) -> Result<PathBuf, DriveupError> {
        let suffix = format!(".{}", self.config.extension);
        candidates
            .iter()
            .filter(|path| {
                file_name(path)
                    .is_some_and(|name| name.starts_with(&self.config.prefix) && name.ends_with(&suffix))
            })
            .map(|path| (self.report_date(path).unwrap_or(NaiveDate::MIN), path))
            .fold(None, |best: Option<(NaiveDate, &PathBuf)>, (date, path)| match best {
                Some((best_date, _)) if best_date >= date => best,
                _ => Some((date, path)),
            })
            .map(|(_, path)| path.clone())
            .ok_or_else(|| DriveupError::NoReportFound {
                pattern: self.pattern(),
            })
    }

    /// Scan and select in one step.
    pub fn locate(&self) -> Result<PathBuf, DriveupError> {
        let candidates = self.find_candidates();
        let latest = self.select_latest(&candidates)?;
        tracing::info!(path = %latest.display(), "selected report");
        Ok(latest)
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()
}
