use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use tempfile::tempdir;

use sigcarve::extract::extraction_cap;
use sigcarve::scanner::{find_occurrences, WindowedScanner};
use sigcarve::{CarveOptions, Carver, Category, Occurrence, SignatureEntry, SignatureTable};

const PROPTEST_CASES: u32 = 64;
const MARKER: [u8; 3] = [0xAB, 0xCD, 0xEF];

/// Bytes that make up most built-in patterns, so random data is dense in hits
const ALPHABET: &[u8] = &[
    0x00, 0x03, 0x04, 0x25, 0x42, 0x4B, 0x4D, 0x50, 0x5A, 0xD8, 0xE0, 0xFE, 0xFF,
];

fn marker_table() -> SignatureTable {
    let mut table = SignatureTable::new();
    table.register(SignatureEntry::new(MARKER, "mrk", Category::Text, "Marker"));
    table
}

fn keyed(occurrences: &[Occurrence<'_>]) -> Vec<(String, u64)> {
    occurrences
        .iter()
        .map(|o| (o.entry.description().to_string(), o.offset))
        .collect()
}

fn dense_data() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(ALPHABET), 0..512)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn planted_markers_are_found_exactly(
        noise in prop::collection::vec(0u8..0x80, 0..2048),
        slots in prop::collection::btree_set(0usize..2048, 0..16),
    ) {
        let mut data = noise;
        let mut planted = BTreeSet::new();
        for slot in slots {
            let start = slot.min(data.len());
            if start + MARKER.len() <= data.len() {
                data[start..start + MARKER.len()].copy_from_slice(&MARKER);
                planted.insert(start as u64);
            }
        }
        // A later marker can overwrite part of an earlier one
        let expected: Vec<u64> = planted
            .into_iter()
            .filter(|&o| data[o as usize..].starts_with(&MARKER))
            .collect();

        let table = marker_table();
        let found: Vec<u64> = find_occurrences(&data, &table).iter().map(|o| o.offset).collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn windowed_scan_matches_whole_buffer(data in dense_data(), window in 1usize..64) {
        let table = SignatureTable::builtin();
        let whole = find_occurrences(&data, &table);

        let scanner = WindowedScanner::new(&table, window);
        let (windowed, consumed) = scanner.scan(Cursor::new(&data)).unwrap();

        prop_assert_eq!(consumed, data.len() as u64);
        prop_assert_eq!(keyed(&windowed), keyed(&whole));
    }

    #[test]
    fn occurrences_are_ordered_by_table_then_offset(data in dense_data()) {
        let table = SignatureTable::builtin();
        let found = find_occurrences(&data, &table);
        let position = |o: &Occurrence<'_>| {
            table
                .entries()
                .iter()
                .position(|e| std::ptr::eq(e, o.entry))
                .unwrap()
        };
        for pair in found.windows(2) {
            let (a, b) = (position(&pair[0]), position(&pair[1]));
            prop_assert!(a < b || (a == b && pair[0].offset < pair[1].offset));
        }
        for occurrence in &found {
            let start = occurrence.offset as usize;
            prop_assert!(data[start..].starts_with(occurrence.entry.pattern()));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn carved_length_is_capped_and_clipped(offset in 0usize..4096, tail in 0usize..4096) {
        let mut data = vec![0u8; offset];
        data.extend_from_slice(b"%PDF");
        data.extend(std::iter::repeat_n(0x11, tail));

        let dir = tempdir().unwrap();
        let source = dir.path().join("doc.img");
        fs::write(&source, &data).unwrap();

        let carver = Carver::new(CarveOptions::default().with_window_size(1024));
        let result = carver.deep_carve(&source, &dir.path().join("out")).unwrap();

        prop_assert_eq!(result.total_recovered, 1);
        let carved = &result.carved_files[0];
        let table = SignatureTable::builtin();
        let cap = extraction_cap(table.lookup(b"%PDF").unwrap());
        let expected_len = cap.min((data.len() - offset) as u64);
        prop_assert_eq!(carved.origin_offset, offset as u64);
        prop_assert_eq!(carved.size, expected_len);

        let written = fs::read(dir.path().join("out").join(&carved.filename)).unwrap();
        prop_assert_eq!(&written[..], &data[offset..offset + expected_len as usize]);
    }
}
