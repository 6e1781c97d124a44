#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;

use bytespool::reverse::{scan_lines, scan_runes, scan_words, ReverseScanner, ScanLimits};

// Scans arbitrary input in reverse with a tiny window and checks that the
// emitted tokens never exceed the input and that the scan terminates.
//
// Byte layout:
// - Byte 0 → split function (`% 3`: lines, words, runes)
// - Byte 1 → initial window (clamped to 1..=255)
// - Remaining bytes → scanned input
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let limits = ScanLimits {
        initial_buf: (data[1] as usize).max(1),
        max_buf: 4096,
    };
    let input = &data[2..];

    let mut scanner = ReverseScanner::with_limits(Cursor::new(input), limits);
    match data[0] % 3 {
        0 => scanner.split(scan_lines),
        1 => scanner.split(scan_words),
        _ => scanner.split(scan_runes),
    };

    let mut total = 0usize;
    while scanner.scan() {
        total += scanner.bytes().len();
        assert!(total <= input.len());
    }
});
