//! Carve orchestration
//!
//! Drives the two passes over a source: a quick, detection-only scan of a
//! bounded prefix, and a deep carve that streams the whole source, extracts
//! every occurrence, hashes it and writes it to an output directory.

use crate::error::{CarveError, Result};
use crate::extract;
use crate::options::CarveOptions;
use crate::results::{CarveResult, CarvedFile, Detection, ScanMode, ScanResult};
use crate::scanner::{find_occurrences, Occurrence, WindowedScanner};
use crate::signatures::SignatureTable;
use crate::source::SourceReader;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;
use tracing::instrument;

/// Deterministic name of a carved file.
///
/// `index` is the position of the occurrence among all occurrences of the
/// same signature.
pub fn carved_filename(extension: &str, offset: u64, index: usize) -> String {
    format!("carved_{extension}_{offset:08x}_{index}.{extension}")
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Signature carving engine
///
/// Holds the signature table for its whole lifetime. Each call is
/// independent: nothing is shared between calls and nothing is resumable.
#[derive(Debug, Clone)]
pub struct Carver {
    table: SignatureTable,
    options: CarveOptions,
}

impl Default for Carver {
    fn default() -> Self {
        Self::new(CarveOptions::default())
    }
}

impl Carver {
    /// Creates a carver over the built-in signature table
    pub fn new(options: CarveOptions) -> Self {
        Self::with_table(SignatureTable::builtin(), options)
    }

    pub fn with_table(table: SignatureTable, options: CarveOptions) -> Self {
        Self { table, options }
    }

    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    /// Detects signatures in the first `quick_scan_limit` bytes of `source`.
    ///
    /// Nothing is extracted or written.
    #[instrument(skip(self))]
    pub fn quick_scan(&self, source: &Path) -> Result<ScanResult> {
        let mut reader = SourceReader::open(source)?;
        let size_bytes = reader.size();
        let prefix = reader.read_prefix(self.options.quick_scan_limit)?;

        let occurrences = find_occurrences(&prefix, &self.table);
        let detections: Vec<Detection> = occurrences.iter().map(Detection::from).collect();

        if (prefix.len() as u64) < size_bytes {
            tracing::warn!(
                scanned = prefix.len(),
                size = size_bytes,
                "Quick scan covers only the start of the source"
            );
        }
        tracing::info!(found = detections.len(), "Quick scan finished");

        Ok(ScanResult {
            source_path: source.to_path_buf(),
            size_bytes,
            bytes_scanned: prefix.len() as u64,
            total_found: detections.len(),
            occurrences: detections,
            mode: ScanMode::Quick,
        })
    }

    /// Carves every occurrence in `source` into `output_dir`.
    ///
    /// The directory is created if needed. The first failed write aborts the
    /// carve; files written before it are left in place.
    #[instrument(skip(self))]
    pub fn deep_carve(&self, source: &Path, output_dir: &Path) -> Result<CarveResult> {
        let mut reader = SourceReader::open(source)?;
        let size = reader.size();

        fs::create_dir_all(output_dir).map_err(|e| CarveError::write(output_dir, e))?;

        let scanner = WindowedScanner::new(&self.table, self.options.window_size);
        let (occurrences, consumed) = scanner
            .scan(reader.stream()?)
            .map_err(|e| CarveError::read(source, e))?;
        if consumed != size {
            return Err(CarveError::read(
                source,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("expected {size} bytes, read {consumed}"),
                ),
            ));
        }
        tracing::info!(
            occurrences = occurrences.len(),
            bytes = size,
            "Scan complete, extracting candidates"
        );

        let mut carved_files = Vec::with_capacity(occurrences.len());
        for group in occurrences.chunk_by(|a, b| std::ptr::eq(a.entry, b.entry)) {
            for (index, occurrence) in group.iter().enumerate() {
                let carved = self.carve_one(&mut reader, occurrence, index, output_dir)?;
                carved_files.push(carved);
            }
        }

        tracing::info!(recovered = carved_files.len(), "Deep carve finished");

        Ok(CarveResult {
            total_recovered: carved_files.len(),
            carved_files,
            output_directory: output_dir.to_path_buf(),
        })
    }

    fn carve_one(
        &self,
        reader: &mut SourceReader,
        occurrence: &Occurrence<'_>,
        index: usize,
        output_dir: &Path,
    ) -> Result<CarvedFile> {
        let entry = occurrence.entry;
        let range = extract::extent(occurrence.offset, reader.size(), entry);
        let data = reader.read_range(range.start, range.end - range.start)?;

        let filename = carved_filename(entry.extension(), occurrence.offset, index);
        let path = output_dir.join(&filename);
        fs::write(&path, &data).map_err(|e| CarveError::write(&path, e))?;

        tracing::debug!(
            file = %filename,
            offset = occurrence.offset,
            size = data.len(),
            "Carved candidate"
        );

        Ok(CarvedFile {
            filename,
            category: entry.category(),
            extension: entry.extension().to_string(),
            size: data.len() as u64,
            digest: sha256_hex(&data),
            origin_offset: occurrence.offset,
            description: entry.description().to_string(),
        })
    }
}
