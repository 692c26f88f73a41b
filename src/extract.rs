//! Candidate extraction policy
//!
//! A candidate file is a fixed-length slice starting at the signature,
//! clipped to the end of the data. No footer or structural boundary is
//! searched for, so a carved file may carry trailing unrelated bytes or be
//! cut short of the real artifact.

use crate::signatures::SignatureEntry;
use std::ops::Range;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;

pub const IMAGE_CAP: u64 = MIB;
pub const LARGE_DOCUMENT_CAP: u64 = 10 * MIB;
pub const ARCHIVE_CAP: u64 = 5 * MIB;
pub const DEFAULT_CAP: u64 = 512 * KIB;

/// Maximum number of bytes carved for a signature
pub fn extraction_cap(entry: &SignatureEntry) -> u64 {
    match entry.extension() {
        "jpg" | "png" | "gif" => IMAGE_CAP,
        "pdf" | "docx" => LARGE_DOCUMENT_CAP,
        "zip" | "rar" => ARCHIVE_CAP,
        _ => DEFAULT_CAP,
    }
}

/// Byte range carved for a match at `offset` in data of `data_len` bytes
pub fn extent(offset: u64, data_len: u64, entry: &SignatureEntry) -> Range<u64> {
    let start = offset.min(data_len);
    let end = start.saturating_add(extraction_cap(entry)).min(data_len);
    start..end
}

/// Carves the candidate for a match at `offset` out of `buffer`
pub fn extract<'a>(buffer: &'a [u8], offset: usize, entry: &SignatureEntry) -> &'a [u8] {
    let range = extent(offset as u64, buffer.len() as u64, entry);
    &buffer[range.start as usize..range.end as usize]
}
