//! Result records handed to reporting.
//!
//! Field names on the wire follow the report format; the Rust names follow
//! the engine's vocabulary.

use crate::scanner::Occurrence;
use crate::signatures::Category;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Confidence attached to every detection: matching is exact-byte only
pub const CONFIDENCE_HIGH: &str = "high";

/// One signature hit reported by a quick scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    #[serde(rename = "signature")]
    pub pattern_hex: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub extension: String,
    pub description: String,
    #[serde(rename = "position")]
    pub offset: u64,
    pub confidence: &'static str,
}

impl From<&Occurrence<'_>> for Detection {
    fn from(occurrence: &Occurrence<'_>) -> Self {
        let entry = occurrence.entry;
        Self {
            pattern_hex: entry.pattern_hex(),
            category: entry.category(),
            extension: entry.extension().to_string(),
            description: entry.description().to_string(),
            offset: occurrence.offset,
            confidence: CONFIDENCE_HIGH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Quick,
}

/// Outcome of a detection-only pass over the start of a source
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    #[serde(rename = "source")]
    pub source_path: PathBuf,
    /// Size of the whole source, not just the scanned prefix
    pub size_bytes: u64,
    /// Number of leading bytes that were actually scanned
    pub bytes_scanned: u64,
    #[serde(rename = "files_found")]
    pub occurrences: Vec<Detection>,
    #[serde(rename = "scan_type")]
    pub mode: ScanMode,
    #[serde(rename = "total_signatures")]
    pub total_found: usize,
}

impl ScanResult {
    /// True when only part of the source was examined
    pub fn is_partial(&self) -> bool {
        self.bytes_scanned < self.size_bytes
    }

    /// Detection count per category
    pub fn category_counts(&self) -> BTreeMap<&'static str, usize> {
        count_categories(self.occurrences.iter().map(|d| d.category))
    }
}

/// A candidate file written to the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarvedFile {
    pub filename: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub extension: String,
    pub size: u64,
    /// Lowercase hex SHA-256 of the carved bytes
    #[serde(rename = "hash_sha256")]
    pub digest: String,
    #[serde(rename = "original_position")]
    pub origin_offset: u64,
    pub description: String,
}

/// Outcome of a full carve
#[derive(Debug, Clone, Serialize)]
pub struct CarveResult {
    #[serde(rename = "recovered_files")]
    pub carved_files: Vec<CarvedFile>,
    pub total_recovered: usize,
    pub output_directory: PathBuf,
}

impl CarveResult {
    pub fn bytes_recovered(&self) -> u64 {
        self.carved_files.iter().map(|f| f.size).sum()
    }

    pub fn category_counts(&self) -> BTreeMap<&'static str, usize> {
        count_categories(self.carved_files.iter().map(|f| f.category))
    }
}

fn count_categories(categories: impl Iterator<Item = Category>) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for category in categories {
        *counts.entry(category.as_str()).or_insert(0) += 1;
    }
    counts
}
