//! Signature table
//!
//! The ordered catalogue of magic bytes the scanner searches for. Entries are
//! kept in an explicit list; a derived index maps exact pattern bytes back to
//! their entry for lookups.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Broad family a signature belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Document,
    Archive,
    Audio,
    Video,
    Executable,
    Database,
    Text,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Document => "document",
            Category::Archive => "archive",
            Category::Audio => "audio",
            Category::Video => "video",
            Category::Executable => "executable",
            Category::Database => "database",
            Category::Text => "text",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A byte pattern conventionally found at the start of a file format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pattern: Vec<u8>,
    extension: String,
    category: Category,
    description: String,
}

impl SignatureEntry {
    pub fn new(
        pattern: impl Into<Vec<u8>>,
        extension: impl Into<String>,
        category: Category,
        description: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            extension: extension.into(),
            category,
            description: description.into(),
        }
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Lowercase hex rendering of the pattern, e.g. `ffd8ffe0`
    pub fn pattern_hex(&self) -> String {
        hex::encode(&self.pattern)
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Ordered, read-only set of signatures
///
/// Patterns are unique within a table. Registering a pattern that is already
/// present replaces the earlier entry's metadata in place: the last
/// registration wins and keeps the slot of the first one.
///
/// ```
/// use sigcarve::signatures::{Category, SignatureEntry, SignatureTable};
///
/// let mut table = SignatureTable::new();
/// let magic = [0x50, 0x4B, 0x03, 0x04];
/// table.register(SignatureEntry::new(magic, "zip", Category::Archive, "ZIP Archive"));
/// table.register(SignatureEntry::new(magic, "docx", Category::Document, "Office Open XML"));
///
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.lookup(&magic).unwrap().extension(), "docx");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    entries: Vec<SignatureEntry>,
    /// Exact pattern bytes -> position in `entries`
    index: HashMap<Vec<u8>, usize>,
}

impl SignatureTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the built-in catalogue
    pub fn builtin() -> Self {
        use Category::*;

        let mut table = Self::new();
        let defs: [(&[u8], &str, Category, &str); 26] = [
            (&[0xFF, 0xD8, 0xFF, 0xE0], "jpg", Image, "JPEG Image"),
            (&[0xFF, 0xD8, 0xFF, 0xE1], "jpg", Image, "JPEG Image (EXIF)"),
            (&[0x89, 0x50, 0x4E, 0x47], "png", Image, "PNG Image"),
            (&[0x47, 0x49, 0x46, 0x38], "gif", Image, "GIF Image"),
            (&[0x42, 0x4D], "bmp", Image, "BMP Image"),
            (&[0x49, 0x49, 0x2A, 0x00], "tif", Image, "TIFF Image"),
            (&[0x25, 0x50, 0x44, 0x46], "pdf", Document, "PDF Document"),
            (&[0x50, 0x4B, 0x03, 0x04], "zip", Archive, "ZIP Archive"),
            (&[0x50, 0x4B, 0x05, 0x06], "zip", Archive, "ZIP Archive (empty)"),
            (&[0x50, 0x4B, 0x07, 0x08], "zip", Archive, "ZIP Archive (spanned)"),
            (&[0x52, 0x61, 0x72, 0x21], "rar", Archive, "RAR Archive"),
            (&[0x37, 0x7A, 0xBC, 0xAF], "7z", Archive, "7-Zip Archive"),
            (&[0xD0, 0xCF, 0x11, 0xE0], "doc", Document, "Microsoft Office"),
            // Same magic as the ZIP local file header; replaces the zip entry.
            (&[0x50, 0x4B, 0x03, 0x04], "docx", Document, "Microsoft Office (new)"),
            (&[0x49, 0x44, 0x33], "mp3", Audio, "MP3 Audio"),
            (&[0xFF, 0xFB], "mp3", Audio, "MP3 Audio (no ID3)"),
            (&[0x52, 0x49, 0x46, 0x46], "avi", Video, "AVI Video"),
            (&[0x66, 0x74, 0x79, 0x70], "mp4", Video, "MP4 Video"),
            (&[0x1A, 0x45, 0xDF, 0xA3], "mkv", Video, "Matroska Video"),
            (&[0x7F, 0x45, 0x4C, 0x46], "elf", Executable, "ELF Executable"),
            (&[0x4D, 0x5A], "exe", Executable, "Windows Executable"),
            (&[0xCA, 0xFE, 0xBA, 0xBE], "class", Executable, "Java Class"),
            (&[0x53, 0x51, 0x4C, 0x69], "sqlite", Database, "SQLite Database"),
            (&[0xEF, 0xBB, 0xBF], "txt", Text, "UTF-8 Text"),
            (&[0xFF, 0xFE], "txt", Text, "UTF-16 LE Text"),
            (&[0xFE, 0xFF], "txt", Text, "UTF-16 BE Text"),
        ];

        for (pattern, ext, category, description) in defs {
            table.register(SignatureEntry::new(pattern, ext, category, description));
        }
        table
    }

    /// Registers a signature, replacing any entry with the same pattern.
    ///
    /// An empty pattern would match at every offset and is ignored.
    pub fn register(&mut self, entry: SignatureEntry) {
        if entry.pattern().is_empty() {
            tracing::warn!(
                extension = entry.extension(),
                "Ignoring signature with an empty pattern"
            );
            return;
        }
        match self.index.get(entry.pattern()) {
            Some(&slot) => {
                tracing::trace!(
                    pattern = %entry.pattern_hex(),
                    replaced = self.entries[slot].extension(),
                    by = entry.extension(),
                    "Signature pattern registered twice; keeping the last registration"
                );
                self.entries[slot] = entry;
            }
            None => {
                self.index.insert(entry.pattern().to_vec(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// All entries in registration order
    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }

    /// Looks up the entry registered for exactly these pattern bytes
    pub fn lookup(&self, pattern: &[u8]) -> Option<&SignatureEntry> {
        self.index.get(pattern).map(|&slot| &self.entries[slot])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the longest pattern, 0 for an empty table
    pub fn max_pattern_len(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.pattern().len())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

    #[test]
    fn test_builtin_collapses_shared_zip_magic() {
        let table = SignatureTable::builtin();
        assert_eq!(table.len(), 25);

        let entry = table.lookup(&ZIP_MAGIC).unwrap();
        assert_eq!(entry.extension(), "docx");
        assert_eq!(entry.category(), Category::Document);
        assert_eq!(entry.description(), "Microsoft Office (new)");

        let zip_rows = table
            .entries()
            .iter()
            .filter(|e| e.pattern() == ZIP_MAGIC)
            .count();
        assert_eq!(zip_rows, 1);
    }

    #[test]
    fn test_replacement_keeps_first_slot() {
        let table = SignatureTable::builtin();
        assert_eq!(table.entries()[7].extension(), "docx");
        assert_eq!(table.entries()[8].description(), "ZIP Archive (empty)");
    }

    #[test]
    fn test_builtin_order_is_stable() {
        let table = SignatureTable::builtin();
        let first = &table.entries()[0];
        assert_eq!(first.pattern_hex(), "ffd8ffe0");
        assert_eq!(first.extension(), "jpg");

        let last = table.entries().last().unwrap();
        assert_eq!(last.pattern(), &[0xFE, 0xFF]);
        assert_eq!(last.description(), "UTF-16 BE Text");
    }

    #[test]
    fn test_builtin_pattern_lengths() {
        let table = SignatureTable::builtin();
        for entry in table.entries() {
            assert!((2..=8).contains(&entry.pattern().len()), "{:?}", entry);
        }
        assert_eq!(table.max_pattern_len(), 4);
    }

    #[test]
    fn test_lookup_unknown_pattern() {
        let table = SignatureTable::builtin();
        assert!(table.lookup(&[0x00, 0x00]).is_none());
        assert!(table.lookup(&[0xFF, 0xD8]).is_none());
    }

    #[test]
    fn test_empty_table() {
        let table = SignatureTable::new();
        assert!(table.is_empty());
        assert_eq!(table.max_pattern_len(), 0);
    }

    #[test]
    fn test_empty_pattern_is_not_registered() {
        let mut table = SignatureTable::new();
        table.register(SignatureEntry::new(Vec::<u8>::new(), "nil", Category::Text, "Empty"));
        table.register(SignatureEntry::new([0x01, 0x02], "bin", Category::Text, "Pair"));

        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].extension(), "bin");
        assert!(table.lookup(&[]).is_none());
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Executable).unwrap();
        assert_eq!(json, "\"executable\"");
    }
}
