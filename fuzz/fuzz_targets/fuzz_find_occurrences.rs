#![no_main]

use libfuzzer_sys::fuzz_target;
use sigcarve::scanner::{find_occurrences, WindowedScanner};
use sigcarve::SignatureTable;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let Some((&window, haystack)) = data.split_first() else {
        return;
    };
    let table = SignatureTable::builtin();
    let whole = find_occurrences(haystack, &table);

    let scanner = WindowedScanner::new(&table, window as usize + 1);
    let (windowed, consumed) = scanner
        .scan(Cursor::new(haystack))
        .expect("in-memory reads cannot fail");

    assert_eq!(consumed, haystack.len() as u64);
    assert_eq!(windowed, whole);
});
