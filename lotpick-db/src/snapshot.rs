use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Draw, DrawRecord};

/// Cached copy of the historical feed, stored as a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<String>>,
    pub results: Vec<Draw>,
}

impl Snapshot {
    pub fn new(source: impl Into<String>, records: &[DrawRecord]) -> Self {
        let dates: Option<Vec<String>> = records.iter().map(|r| r.date.clone()).collect();
        Self {
            fetched_at: Utc::now(),
            source: source.into(),
            dates,
            results: records.iter().map(|r| r.draw).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read snapshot {:?}", path))?;
        let snapshot: Snapshot = serde_json::from_str(&json)
            .with_context(|| format!("Invalid snapshot JSON in {:?}", path))?;
        Ok(snapshot)
    }

    /// Writes the document unless the file already holds the same source and draws.
    /// Returns `true` when something was written.
    pub fn save(&self, path: &Path) -> Result<bool> {
        if let Ok(existing) = Self::load(path) {
            if existing.same_content(self) {
                log::info!("Snapshot {:?} unchanged, skipping write", path);
                return Ok(false);
            }
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create directory {:?}", parent))?;
            }
        }
        let json = serde_json::to_string_pretty(self)? + "\n";
        std::fs::write(path, json).with_context(|| format!("Cannot write {:?}", path))?;
        log::info!("Wrote {:?} with {} rows", path, self.results.len());
        Ok(true)
    }

    fn same_content(&self, other: &Snapshot) -> bool {
        self.source == other.source && self.dates == other.dates && self.results == other.results
    }

    /// Pairs each draw with its date when the document carries one date per draw.
    pub fn records(&self) -> Vec<DrawRecord> {
        let dates = self
            .dates
            .as_ref()
            .filter(|d| d.len() == self.results.len());
        self.results
            .iter()
            .enumerate()
            .map(|(i, draw)| DrawRecord {
                date: dates.map(|d| d[i].clone()),
                draw: *draw,
            })
            .collect()
    }
}
