//! Report documents
//!
//! Wraps scan, carve and analysis results in a document with a metadata
//! block, a derived summary and recommendations, and persists it as JSON.
//! The generator has no side effects until [`ReportGenerator::write`].

use crate::forensics::{CarveOutcome, ForensicAnalysis};
use crate::results::{CarveResult, Detection, ScanResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TOOL_NAME: &str = "sigcarve";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

const HIGH_POTENTIAL_BYTES: u64 = 1000 * 1024 * 1024;

const BASE_RECOMMENDATIONS: [&str; 4] = [
    "Maintain chain of custody for forensic evidence",
    "Create multiple backups of recovered data",
    "Verify file integrity using cryptographic hashes",
    "Document all recovery procedures and findings",
];

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Cannot write report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cannot serialize report as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Directory reports are written to; created on first write
    pub report_dir: PathBuf,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("reports"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    QuickScan,
    DeepCarve,
    ForensicAnalysis,
}

impl ReportKind {
    fn file_stem(&self) -> &'static str {
        match self {
            ReportKind::QuickScan => "quick_scan",
            ReportKind::DeepCarve => "deep_carve",
            ReportKind::ForensicAnalysis => "forensic_report",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub tool: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub scan_type: ReportKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanParameters {
    pub source: PathBuf,
    pub size_bytes: u64,
    pub bytes_scanned: u64,
    pub output_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionResults {
    pub total_signatures_found: usize,
    pub files_detected: Vec<Detection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInformation {
    pub operating_system: &'static str,
    pub architecture: &'static str,
    pub cpu_threads: usize,
}

impl SystemInformation {
    pub fn current() -> Self {
        Self {
            operating_system: std::env::consts::OS,
            architecture: std::env::consts::ARCH,
            cpu_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Potential {
    High,
    Moderate,
}

#[derive(Debug, Clone, Serialize)]
pub struct Findings {
    pub data_recovery_potential: Potential,
    pub notable_artifacts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportPayload {
    Detection {
        scan_parameters: ScanParameters,
        results: DetectionResults,
    },
    Carve {
        scan_parameters: ScanParameters,
        results: CarveResult,
    },
    Forensic {
        system_information: SystemInformation,
        analysis_results: ForensicAnalysis,
        findings: Findings,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub file_type_breakdown: BTreeMap<&'static str, usize>,
    pub total_files_detected: usize,
    pub confidence_level: &'static str,
    pub estimated_recovery_potential: String,
}

impl Summary {
    fn from_counts(file_type_breakdown: BTreeMap<&'static str, usize>) -> Self {
        let total: usize = file_type_breakdown.values().sum();
        Self {
            file_type_breakdown,
            total_files_detected: total,
            confidence_level: if total > 0 { "HIGH" } else { "LOW" },
            estimated_recovery_potential: format!("{} files", total),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub payload: ReportPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    pub recommendations: Vec<String>,
}

/// Files produced by [`ReportGenerator::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub json: PathBuf,
    pub yaml: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
    options: ReportOptions,
}

impl ReportGenerator {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn quick_report(&self, scan: &ScanResult, output_dir: Option<&Path>) -> Report {
        Report {
            metadata: metadata(ReportKind::QuickScan, Local::now()),
            payload: ReportPayload::Detection {
                scan_parameters: ScanParameters {
                    source: scan.source_path.clone(),
                    size_bytes: scan.size_bytes,
                    bytes_scanned: scan.bytes_scanned,
                    output_directory: output_dir.map(Path::to_path_buf),
                },
                results: DetectionResults {
                    total_signatures_found: scan.total_found,
                    files_detected: scan.occurrences.clone(),
                },
            },
            summary: Some(Summary::from_counts(scan.category_counts())),
            recommendations: base_recommendations(),
        }
    }

    pub fn carve_report(&self, carve: &CarveResult, source: &Path, size_bytes: u64) -> Report {
        Report {
            metadata: metadata(ReportKind::DeepCarve, Local::now()),
            payload: ReportPayload::Carve {
                scan_parameters: ScanParameters {
                    source: source.to_path_buf(),
                    size_bytes,
                    bytes_scanned: size_bytes,
                    output_directory: Some(carve.output_directory.clone()),
                },
                results: carve.clone(),
            },
            summary: Some(Summary::from_counts(carve.category_counts())),
            recommendations: base_recommendations(),
        }
    }

    pub fn forensic_report(&self, analysis: &ForensicAnalysis) -> Report {
        let mut recommendations = base_recommendations();
        let mut notable_artifacts = Vec::new();

        match &analysis.deleted_files {
            Some(CarveOutcome::Unsupported { reason }) => {
                notable_artifacts.push(format!("Deleted-file carving unsupported: {}", reason));
                recommendations.push(
                    "Consider using specialized carving tools for deleted file recovery".into(),
                );
            }
            Some(CarveOutcome::Completed(result)) => {
                notable_artifacts.push(format!(
                    "{} candidate files carved to {}",
                    result.total_recovered,
                    result.output_directory.display()
                ));
            }
            None => {}
        }

        let data_recovery_potential = if analysis.source_info.size_bytes > HIGH_POTENTIAL_BYTES {
            Potential::High
        } else {
            Potential::Moderate
        };

        let summary = match &analysis.deleted_files {
            Some(CarveOutcome::Completed(result)) => {
                Some(Summary::from_counts(result.category_counts()))
            }
            _ => None,
        };

        Report {
            metadata: metadata(ReportKind::ForensicAnalysis, Local::now()),
            payload: ReportPayload::Forensic {
                system_information: SystemInformation::current(),
                analysis_results: analysis.clone(),
                findings: Findings {
                    data_recovery_potential,
                    notable_artifacts,
                },
            },
            summary,
            recommendations,
        }
    }

    /// Writes `report` as pretty JSON into the report directory.
    ///
    /// Forensic reports are mirrored as YAML next to the JSON file.
    pub fn write(&self, report: &Report) -> Result<WrittenReport> {
        let dir = &self.options.report_dir;
        fs::create_dir_all(dir).map_err(|source| ReportError::Io {
            path: dir.clone(),
            source,
        })?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let base = dir.join(format!("{}_{}", report.metadata.scan_type.file_stem(), stamp));

        let json = base.with_extension("json");
        write_file(&json, serde_json::to_string_pretty(report)?)?;
        tracing::info!(path = %json.display(), "Report saved");

        let yaml = if report.metadata.scan_type == ReportKind::ForensicAnalysis {
            let path = base.with_extension("yaml");
            write_file(&path, serde_yaml::to_string(report)?)?;
            tracing::debug!(path = %path.display(), "YAML mirror saved");
            Some(path)
        } else {
            None
        };

        Ok(WrittenReport { json, yaml })
    }
}

fn write_file(path: &Path, contents: String) -> Result<()> {
    fs::write(path, contents).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Short plain-text digest of a report for the console
pub fn summary_text(report: &Report) -> String {
    let mut text = format!(
        "Tool: {} {}\nScan type: {:?}\nTimestamp: {}\n",
        report.metadata.tool,
        report.metadata.version,
        report.metadata.scan_type,
        report.metadata.timestamp
    );

    if let Some(summary) = &report.summary {
        text.push_str(&format!(
            "Files detected: {} (confidence {})\n",
            summary.total_files_detected, summary.confidence_level
        ));
        for (category, count) in &summary.file_type_breakdown {
            text.push_str(&format!("  - {}: {}\n", category, count));
        }
    }

    text
}

fn metadata(kind: ReportKind, now: DateTime<Local>) -> ReportMetadata {
    ReportMetadata {
        tool: TOOL_NAME,
        version: TOOL_VERSION,
        timestamp: now.to_rfc3339(),
        scan_type: kind,
    }
}

fn base_recommendations() -> Vec<String> {
    BASE_RECOMMENDATIONS.iter().map(|r| r.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{CONFIDENCE_HIGH, ScanMode};
    use crate::signatures::Category;
    use tempfile::tempdir;

    fn sample_scan() -> ScanResult {
        let detection = |category, extension: &str, offset| Detection {
            pattern_hex: "00".into(),
            category,
            extension: extension.into(),
            description: String::new(),
            offset,
            confidence: CONFIDENCE_HIGH,
        };
        ScanResult {
            source_path: PathBuf::from("disk.img"),
            size_bytes: 4096,
            bytes_scanned: 4096,
            occurrences: vec![
                detection(Category::Image, "jpg", 0),
                detection(Category::Image, "png", 100),
                detection(Category::Archive, "rar", 200),
            ],
            mode: ScanMode::Quick,
            total_found: 3,
        }
    }

    #[test]
    fn test_quick_report_layout() {
        let generator = ReportGenerator::default();
        let report = generator.quick_report(&sample_scan(), None);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["metadata"]["tool"], "sigcarve");
        assert_eq!(value["metadata"]["scan_type"], "quick_scan");
        assert_eq!(value["scan_parameters"]["source"], "disk.img");
        assert_eq!(value["results"]["total_signatures_found"], 3);
        assert_eq!(value["summary"]["file_type_breakdown"]["image"], 2);
        assert_eq!(value["summary"]["confidence_level"], "HIGH");
        assert_eq!(value["summary"]["estimated_recovery_potential"], "3 files");
        assert_eq!(value["recommendations"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_empty_scan_is_low_confidence() {
        let mut scan = sample_scan();
        scan.occurrences.clear();
        scan.total_found = 0;
        let report = ReportGenerator::default().quick_report(&scan, None);
        let summary = report.summary.unwrap();
        assert_eq!(summary.confidence_level, "LOW");
        assert_eq!(summary.total_files_detected, 0);
    }

    #[test]
    fn test_write_creates_report_dir() {
        let dir = tempdir().unwrap();
        let report_dir = dir.path().join("nested").join("reports");
        let generator = ReportGenerator::new(ReportOptions {
            report_dir: report_dir.clone(),
        });
        assert!(!report_dir.exists());

        let report = generator.quick_report(&sample_scan(), None);
        let written = generator.write(&report).unwrap();
        assert!(written.yaml.is_none());
        let path = written.json;

        assert!(path.starts_with(&report_dir));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("quick_scan_") && name.ends_with(".json"));
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["results"]["files_detected"][2]["extension"], "rar");
    }

    fn sample_analysis() -> ForensicAnalysis {
        use crate::forensics::SourceInfo;

        ForensicAnalysis {
            source_info: SourceInfo {
                path: PathBuf::from("/tmp/evidence"),
                size_bytes: 4096,
                size_human: "4.00 KB".into(),
                created: None,
                modified: None,
                is_file: false,
                is_block_device: false,
            },
            file_type: Some("directory".into()),
            tools_available: vec!["file".into()],
            deleted_files: Some(CarveOutcome::Unsupported {
                reason: "not a file".into(),
            }),
        }
    }

    #[test]
    fn test_forensic_report_recommends_tools_when_unsupported() {
        let report = ReportGenerator::default().forensic_report(&sample_analysis());
        assert!(report.summary.is_none());
        assert_eq!(report.recommendations.len(), 5);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["findings"]["data_recovery_potential"], "MODERATE");
        assert_eq!(value["analysis_results"]["deleted_files"]["status"], "unsupported");
    }

    #[test]
    fn test_forensic_report_is_mirrored_as_yaml() {
        let dir = tempdir().unwrap();
        let generator = ReportGenerator::new(ReportOptions {
            report_dir: dir.path().to_path_buf(),
        });

        let report = generator.forensic_report(&sample_analysis());
        let written = generator.write(&report).unwrap();

        let yaml_path = written.yaml.unwrap();
        assert_eq!(yaml_path.with_extension("json"), written.json);
        assert!(written.json.exists());

        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&yaml_path).unwrap()).unwrap();
        assert_eq!(yaml["metadata"]["scan_type"].as_str(), Some("forensic_analysis"));
        assert_eq!(
            yaml["analysis_results"]["source_info"]["size_bytes"].as_u64(),
            Some(4096)
        );
    }

    #[test]
    fn test_summary_text_lists_categories() {
        let report = ReportGenerator::default().quick_report(&sample_scan(), None);
        let text = summary_text(&report);
        assert!(text.contains("Files detected: 3"));
        assert!(text.contains("  - archive: 1"));
    }
}
