//! Occurrence scanning
//!
//! Every signature is searched for independently and exhaustively: after a
//! hit at `p` the search resumes at `p + 1`, so overlapping occurrences on
//! repetitive data are all reported. Results are ordered by signature table
//! position first and ascending offset second.

use crate::signatures::{SignatureEntry, SignatureTable};
use memchr::memmem;
use std::io::{self, Read};

/// A signature found at a byte offset of the scanned data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence<'t> {
    pub entry: &'t SignatureEntry,
    pub offset: u64,
}

/// Finds every occurrence of every table signature in `buffer`
pub fn find_occurrences<'t>(buffer: &[u8], table: &'t SignatureTable) -> Vec<Occurrence<'t>> {
    let mut occurrences = Vec::new();
    for entry in table.entries() {
        for offset in find_all(buffer, entry.pattern()) {
            occurrences.push(Occurrence {
                entry,
                offset: offset as u64,
            });
        }
    }
    occurrences
}

/// All start offsets of `pattern` in `haystack`, overlapping matches included
pub fn find_all(haystack: &[u8], pattern: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    if pattern.is_empty() || haystack.len() < pattern.len() {
        return positions;
    }

    let finder = memmem::Finder::new(pattern);
    let mut start = 0;
    while let Some(pos) = finder.find(&haystack[start..]) {
        positions.push(start + pos);
        start += pos + 1;
    }
    positions
}

/// Scans a stream in fixed-size windows
///
/// The last `max_pattern_len - 1` bytes of each window are carried into the
/// next one so that signatures straddling a window boundary are still found.
/// A match lying entirely inside the carried bytes was already reported by
/// the previous window and is skipped. The output is the same as
/// [`find_occurrences`] over the whole stream.
pub struct WindowedScanner<'t> {
    table: &'t SignatureTable,
    finders: Vec<memmem::Finder<'t>>,
    window_size: usize,
}

impl<'t> WindowedScanner<'t> {
    pub fn new(table: &'t SignatureTable, window_size: usize) -> Self {
        let finders = table
            .entries()
            .iter()
            .map(|e| memmem::Finder::new(e.pattern()))
            .collect();
        Self {
            table,
            finders,
            window_size: window_size.max(1),
        }
    }

    /// Reads `reader` to the end and returns every occurrence.
    ///
    /// Also returns the number of bytes consumed.
    pub fn scan<R: Read>(&self, mut reader: R) -> io::Result<(Vec<Occurrence<'t>>, u64)> {
        let entries = self.table.entries();
        let carry_len = self.table.max_pattern_len().saturating_sub(1);

        let mut per_entry: Vec<Vec<u64>> = vec![Vec::new(); entries.len()];
        let mut window: Vec<u8> = Vec::with_capacity(carry_len + self.window_size);
        // Absolute offset of window[0]
        let mut base: u64 = 0;
        // Bytes at the front of `window` that the previous pass already saw
        let mut seen: usize = 0;
        let mut consumed: u64 = 0;
        let mut windows = 0usize;

        loop {
            let fresh = fill(&mut reader, &mut window, self.window_size)?;
            if fresh == 0 {
                break;
            }
            consumed += fresh as u64;
            windows += 1;

            for (slot, finder) in self.finders.iter().enumerate() {
                let plen = finder.needle().len();
                let mut start = 0;
                while let Some(pos) = finder.find(&window[start..]) {
                    let hit = start + pos;
                    if hit + plen > seen {
                        per_entry[slot].push(base + hit as u64);
                    }
                    start = hit + 1;
                }
            }

            tracing::trace!(window = windows, base, len = window.len(), "Scanned window");

            let keep = carry_len.min(window.len());
            let drop = window.len() - keep;
            window.drain(..drop);
            base += drop as u64;
            seen = window.len();
        }

        let occurrences = entries
            .iter()
            .zip(per_entry)
            .flat_map(|(entry, offsets)| {
                offsets
                    .into_iter()
                    .map(move |offset| Occurrence { entry, offset })
            })
            .collect();

        Ok((occurrences, consumed))
    }
}

/// Appends up to `limit` bytes from `reader` to `buf`, returning how many
/// were read. Short reads are retried until `limit` or end of stream.
fn fill<R: Read>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> io::Result<usize> {
    let start = buf.len();
    buf.resize(start + limit, 0);
    let mut filled = 0;
    while filled < limit {
        match reader.read(&mut buf[start + filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                buf.truncate(start + filled);
                return Err(e);
            }
        }
    }
    buf.truncate(start + filled);
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::Category;
    use std::io::Cursor;

    fn table_of(patterns: &[&[u8]]) -> SignatureTable {
        let mut table = SignatureTable::new();
        for (i, p) in patterns.iter().enumerate() {
            table.register(SignatureEntry::new(
                *p,
                format!("e{}", i),
                Category::Text,
                "test",
            ));
        }
        table
    }

    #[test]
    fn test_find_all_overlapping() {
        let data = [0xAA; 6];
        assert_eq!(find_all(&data, &[0xAA, 0xAA]), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_find_all_shorter_haystack() {
        assert!(find_all(&[0xFF, 0xD8], &[0xFF, 0xD8, 0xFF]).is_empty());
        assert!(find_all(&[], &[0x42, 0x4D]).is_empty());
    }

    #[test]
    fn test_order_is_table_then_offset() {
        let table = table_of(&[b"BB", b"AA"]);
        let data = b"AA..BB..AA..BB";
        let found = find_occurrences(data, &table);
        let pairs: Vec<_> = found
            .iter()
            .map(|o| (o.entry.extension().to_string(), o.offset))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("e0".to_string(), 4),
                ("e0".to_string(), 12),
                ("e1".to_string(), 0),
                ("e1".to_string(), 8),
            ]
        );
    }

    #[test]
    fn test_window_boundary_match() {
        let table = table_of(&[&[0xFF, 0xD8, 0xFF, 0xE0]]);
        let mut data = vec![0u8; 10];
        data[3..7].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);

        let scanner = WindowedScanner::new(&table, 5);
        let (found, consumed) = scanner.scan(Cursor::new(&data)).unwrap();
        assert_eq!(consumed, 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].offset, 3);
    }

    #[test]
    fn test_window_does_not_duplicate_short_patterns() {
        // A 2-byte pattern inside the carried tail of a table whose longest
        // pattern is 4 bytes must be reported once.
        let table = table_of(&[&[0x42, 0x4D], &[0x7F, 0x45, 0x4C, 0x46]]);
        let mut data = vec![0u8; 16];
        data[6..8].copy_from_slice(&[0x42, 0x4D]);

        for window in 1..=16 {
            let scanner = WindowedScanner::new(&table, window);
            let (found, _) = scanner.scan(Cursor::new(&data)).unwrap();
            assert_eq!(found.len(), 1, "window size {}", window);
            assert_eq!(found[0].offset, 6);
        }
    }

    #[test]
    fn test_windowed_matches_whole_buffer() {
        let table = SignatureTable::builtin();
        let mut data: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(97) % 256) as u8).collect();
        data[100..104].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
        data[1023..1027].copy_from_slice(&[0x50, 0x4B, 0x03, 0x04]);
        data[2047..2049].copy_from_slice(&[0x4D, 0x5A]);

        let whole = find_occurrences(&data, &table);
        for window in [1, 3, 7, 64, 1000, 8192] {
            let (streamed, _) = WindowedScanner::new(&table, window)
                .scan(Cursor::new(&data))
                .unwrap();
            assert_eq!(streamed, whole, "window size {}", window);
        }
    }

    #[test]
    fn test_windowed_scan_ignores_empty_pattern() {
        let table = table_of(&[&[], &[0x01, 0x02]]);
        let mut data = vec![0u8; 10];
        data[6..8].copy_from_slice(&[0x01, 0x02]);

        let (found, consumed) = WindowedScanner::new(&table, 4)
            .scan(Cursor::new(&data))
            .unwrap();
        assert_eq!(consumed, 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].offset, 6);
        assert_eq!(found, find_occurrences(&data, &table));
    }

    #[test]
    fn test_windowed_empty_stream() {
        let table = SignatureTable::builtin();
        let (found, consumed) = WindowedScanner::new(&table, 64)
            .scan(Cursor::new(Vec::<u8>::new()))
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(consumed, 0);
    }
}
