//! Export functionality for KPI values
//!
//! This module writes single KPI values to text files (the tile "download"
//! action) and whole dashboard snapshots to JSON.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;
use serde::Serialize;

use crate::core::{ActiveFilter, FilterState, KpiTile, SessionMetrics, KPI_TILES};

/// Writes KPI data into a target directory
pub struct KpiExporter {
    directory: PathBuf,
}

/// JSON shape of a dashboard snapshot
#[derive(Debug, Serialize)]
pub struct DashboardSnapshot<'a> {
    pub generated_at: String,
    pub filters: &'a FilterState,
    pub active_filters: Vec<ActiveFilter>,
    pub metrics: Option<&'a SessionMetrics>,
}

impl KpiExporter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    /// File name for a tile: lowercased title, whitespace runs replaced by `_`
    pub fn file_name(title: &str) -> String {
        static WHITESPACE: OnceLock<Regex> = OnceLock::new();
        let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
        format!("{}_data.txt", whitespace.replace_all(&title.to_lowercase(), "_"))
    }

    /// Export one tile's value. Returns the written path.
    pub fn export_tile(&self, tile: &KpiTile, metrics: &SessionMetrics) -> Result<PathBuf> {
        self.export_value(tile.title, tile.value(metrics))
    }

    pub fn export_value(&self, title: &str, value: u64) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)
            .with_context(|| format!("Failed to create {}", self.directory.display()))?;

        let path = self.directory.join(Self::file_name(title));
        let content = format!(
            "{}: {}\nGenerated: {}",
            title,
            value,
            Local::now().to_rfc3339()
        );
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!("Exported {} to {}", title, path.display());
        Ok(path)
    }

    /// Write every tile as `title: value` lines
    pub fn export_all_to_writer<W: Write>(&self, metrics: &SessionMetrics, writer: &mut W) -> Result<()> {
        for tile in KPI_TILES.iter() {
            writeln!(writer, "{}: {}", tile.title, tile.value(metrics))?;
        }
        Ok(())
    }

    /// Serialize the current filters and metrics
    pub fn snapshot_json(filters: &FilterState, metrics: Option<&SessionMetrics>) -> Result<String> {
        let snapshot = DashboardSnapshot {
            generated_at: Local::now().to_rfc3339(),
            filters,
            active_filters: filters.active_filters(),
            metrics,
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    pub fn export_snapshot(&self, filters: &FilterState, metrics: Option<&SessionMetrics>) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)
            .with_context(|| format!("Failed to create {}", self.directory.display()))?;

        let path = self.directory.join("dashboard_snapshot.json");
        fs::write(&path, Self::snapshot_json(filters, metrics)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use crate::core::{DateRange, FilterKey};
    use chrono::NaiveDate;

    #[test]
    fn test_file_name_normalizes_whitespace() {
        assert_eq!(
            KpiExporter::file_name("Sessions Available in  Output API"),
            "sessions_available_in_output_api_data.txt"
        );
        assert_eq!(KpiExporter::file_name("Sessions Failed"), "sessions_failed_data.txt");
    }

    #[test]
    fn test_export_tile() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = KpiExporter::new(temp_dir.path());
        let metrics = SessionMetrics { sessions_failed: 17, ..Default::default() };
        let tile = KPI_TILES.iter().find(|t| t.title == "Sessions Failed").unwrap();

        let path = exporter.export_tile(tile, &metrics).unwrap();

        assert_eq!(path, temp_dir.path().join("sessions_failed_data.txt"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("Sessions Failed: 17\nGenerated: "));
    }

    #[test]
    fn test_export_all_to_writer() {
        let exporter = KpiExporter::new(".");
        let metrics = SessionMetrics { unique_users_visited: 300, ..Default::default() };
        let mut out = Vec::new();

        exporter.export_all_to_writer(&metrics, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), KPI_TILES.len());
        assert!(text.contains("Unique Users Visited: 300"));
    }

    #[test]
    fn test_snapshot_contains_active_filter() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let filters = FilterState {
            created: DateRange::between(
                day.and_hms_opt(0, 0, 0).unwrap(),
                day.and_hms_opt(23, 0, 0).unwrap(),
            ),
            ..Default::default()
        };

        let json = KpiExporter::snapshot_json(&filters, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["active_filters"][0]["key"], serde_json::json!(FilterKey::Created.slug()));
        assert!(value["metrics"].is_null());
    }
}
