//! Source probing and system readiness.
//!
//! Thin layer over the carver: it describes a source and, on request,
//! delegates deleted-file recovery to [`Carver::deep_carve`]. It adds no
//! carving logic of its own.

use crate::carver::Carver;
use crate::error::{CarveError, Result};
use crate::results::CarveResult;
use crate::source::SourceReader;
use crate::utils::format_bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;

/// External tools whose presence is reported alongside an analysis
pub const FORENSIC_TOOLS: [&str; 4] = ["file", "strings", "hexdump", "dd"];

const GIB: u64 = 1024 * 1024 * 1024;
const DISK_SPACE_PASS: u64 = 10 * GIB;
const DISK_SPACE_WARN: u64 = GIB;
const MEMORY_PASS: u64 = 2 * GIB;
const MEMORY_WARN: u64 = GIB / 2;

#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub size_human: String,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub is_file: bool,
    pub is_block_device: bool,
}

/// Result of asking for deleted-file recovery on a source
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CarveOutcome {
    /// The carve ran; the result may still be empty
    Completed(CarveResult),
    /// The source cannot be carved; nothing was attempted
    Unsupported { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ForensicAnalysis {
    pub source_info: SourceInfo,
    /// Output of `file -b` on the source, when the tool is available
    pub file_type: Option<String>,
    pub tools_available: Vec<String>,
    pub deleted_files: Option<CarveOutcome>,
}

/// Collects metadata about `path` without reading its content
pub fn inspect_source(path: &Path) -> Result<SourceInfo> {
    if !path.try_exists().map_err(|e| CarveError::read(path, e))? {
        return Err(CarveError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let metadata = fs::metadata(path).map_err(|e| CarveError::read(path, e))?;
    let is_block_device = is_block_device(&metadata);

    let size_bytes = if is_block_device {
        SourceReader::open(path)?.size()
    } else {
        metadata.len()
    };

    Ok(SourceInfo {
        path: fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
        size_bytes,
        size_human: format_bytes(size_bytes),
        created: metadata.created().ok().map(rfc3339),
        modified: metadata.modified().ok().map(rfc3339),
        is_file: metadata.is_file(),
        is_block_device,
    })
}

/// Describes `source` and optionally carves it into `output_dir`.
///
/// Carving is only attempted for regular files and block devices; any other
/// kind of path yields [`CarveOutcome::Unsupported`].
#[tracing::instrument(skip(carver))]
pub fn analyze(
    carver: &Carver,
    source: &Path,
    output_dir: &Path,
    carve_deleted: bool,
) -> Result<ForensicAnalysis> {
    let source_info = inspect_source(source)?;

    let deleted_files = if !carve_deleted {
        None
    } else if source_info.is_file || source_info.is_block_device {
        Some(CarveOutcome::Completed(carver.deep_carve(source, output_dir)?))
    } else {
        tracing::warn!("Source is neither a file nor a block device; not carving");
        Some(CarveOutcome::Unsupported {
            reason: format!(
                "{} is neither a regular file nor a block device",
                source.display()
            ),
        })
    };

    Ok(ForensicAnalysis {
        source_info,
        file_type: describe_with_file_tool(source),
        tools_available: available_tools(),
        deleted_files,
    })
}

/// Names of the [`FORENSIC_TOOLS`] that can be launched
pub fn available_tools() -> Vec<String> {
    FORENSIC_TOOLS
        .iter()
        .filter(|tool| {
            Command::new(tool)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok()
        })
        .map(|tool| tool.to_string())
        .collect()
}

fn describe_with_file_tool(path: &Path) -> Option<String> {
    let output = Command::new("file").arg("-b").arg(path).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
}

/// Checks that the environment is fit for carving into `output_dir`
pub fn readiness(output_dir: &Path) -> Vec<ReadinessCheck> {
    vec![
        check_privileges(),
        check_disk_space(output_dir),
        check_memory(),
        check_tools(&available_tools()),
    ]
}

fn check_privileges() -> ReadinessCheck {
    #[cfg(unix)]
    let (status, message) = if rustix::process::geteuid().is_root() {
        (CheckStatus::Pass, "Root privileges available".to_string())
    } else {
        (
            CheckStatus::Warning,
            "Running as non-root user; block devices may be unreadable".to_string(),
        )
    };

    #[cfg(not(unix))]
    let (status, message) = (
        CheckStatus::Warning,
        "Privilege level cannot be determined on this platform".to_string(),
    );

    ReadinessCheck {
        name: "root_privileges",
        status,
        message,
    }
}

fn check_disk_space(output_dir: &Path) -> ReadinessCheck {
    let (status, message) = match free_space(output_dir) {
        Some(free) => disk_space_status(free),
        None => (
            CheckStatus::Fail,
            format!("Cannot determine free space at {}", output_dir.display()),
        ),
    };
    ReadinessCheck {
        name: "disk_space",
        status,
        message,
    }
}

fn disk_space_status(free: u64) -> (CheckStatus, String) {
    if free > DISK_SPACE_PASS {
        (CheckStatus::Pass, format!("{} free space available", format_bytes(free)))
    } else if free > DISK_SPACE_WARN {
        (CheckStatus::Warning, format!("Low disk space: {} free", format_bytes(free)))
    } else {
        (CheckStatus::Fail, format!("Critical disk space: {} free", format_bytes(free)))
    }
}

fn check_memory() -> ReadinessCheck {
    let (status, message) = match available_memory() {
        Some(available) => memory_status(available),
        None => (
            CheckStatus::Warning,
            "Available memory cannot be determined on this platform".to_string(),
        ),
    };
    ReadinessCheck {
        name: "memory_available",
        status,
        message,
    }
}

fn memory_status(available: u64) -> (CheckStatus, String) {
    if available > MEMORY_PASS {
        (CheckStatus::Pass, format!("{} RAM available", format_bytes(available)))
    } else if available > MEMORY_WARN {
        (CheckStatus::Warning, format!("Low memory: {} available", format_bytes(available)))
    } else {
        (CheckStatus::Fail, format!("Critical memory: {} available", format_bytes(available)))
    }
}

/// `MemAvailable` from `/proc/meminfo` content, in bytes
fn parse_mem_available(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemAvailable:"))?;
    let kib = line.split_whitespace().nth(1)?.parse::<u64>().ok()?;
    Some(kib.saturating_mul(1024))
}

#[cfg(target_os = "linux")]
fn available_memory() -> Option<u64> {
    parse_mem_available(&fs::read_to_string("/proc/meminfo").ok()?)
}

#[cfg(not(target_os = "linux"))]
fn available_memory() -> Option<u64> {
    None
}

fn check_tools(available: &[String]) -> ReadinessCheck {
    let missing: Vec<&str> = FORENSIC_TOOLS
        .iter()
        .copied()
        .filter(|t| !available.iter().any(|a| a == t))
        .collect();
    let (status, message) = if missing.is_empty() {
        (CheckStatus::Pass, "All helper tools available".to_string())
    } else {
        (
            CheckStatus::Warning,
            format!("Missing helper tools: {}", missing.join(", ")),
        )
    };
    ReadinessCheck {
        name: "essential_tools",
        status,
        message,
    }
}

/// Free bytes on the filesystem holding `path` or its closest existing ancestor
#[cfg(unix)]
fn free_space(path: &Path) -> Option<u64> {
    let absolute = std::path::absolute(path).ok()?;
    let existing = absolute.ancestors().find(|p| p.exists())?;
    let stat = rustix::fs::statvfs(existing).ok()?;
    Some(stat.f_bavail.saturating_mul(stat.f_frsize))
}

#[cfg(not(unix))]
fn free_space(_path: &Path) -> Option<u64> {
    None
}

#[cfg(unix)]
fn is_block_device(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    metadata.file_type().is_block_device()
}

#[cfg(not(unix))]
fn is_block_device(_metadata: &fs::Metadata) -> bool {
    false
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}
