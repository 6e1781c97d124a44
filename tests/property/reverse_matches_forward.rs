//! Property tests for the reverse scanner.
//!
//! For boundary-stable split functions, scanning in reverse must produce
//! the forward token sequence reversed, whatever the window size.

use std::io::Cursor;

use proptest::prelude::*;

use bytespool::reverse::{scan_lines, scan_runes, scan_words, ReverseScanner, ScanLimits, Step};
use bytespool::SplitError;

type Split = fn(&[u8], bool) -> Result<Step, SplitError>;

/// Reference forward scan using the same split function.
fn forward(data: &[u8], split: Split) -> Vec<Vec<u8>> {
    let mut tokens = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        match split(rest, true).unwrap() {
            Step::More => break,
            Step::Advance { advance, token } => {
                if let Some(range) = token {
                    tokens.push(rest[range].to_vec());
                }
                rest = &rest[advance..];
            }
        }
    }
    tokens
}

fn reverse(data: &[u8], split: Split, initial_buf: usize) -> Vec<Vec<u8>> {
    let limits = ScanLimits {
        initial_buf,
        max_buf: 4096,
    };
    let mut scanner = ReverseScanner::with_limits(Cursor::new(data.to_vec()), limits);
    scanner.split(split);
    let mut tokens: Vec<Vec<u8>> = scanner.into_tokens().map(|t| t.unwrap()).collect();
    tokens.reverse();
    tokens
}

fn text_strategy() -> impl Strategy<Value = Vec<u8>> {
    // A small alphabet keeps delimiters frequent.
    prop::collection::vec(
        prop::sample::select(vec![b'a', b'b', b' ', b'\n', b'\r', b'\t', b'z']),
        0..300,
    )
}

fn multibyte_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(vec!['a', 'é', '€', '𝄞', '\n']), 0..200)
        .prop_map(|chars| chars.into_iter().collect::<String>().into_bytes())
}

proptest! {
    #[test]
    fn lines_reverse_forward(data in text_strategy(), initial in 1usize..64) {
        prop_assert_eq!(reverse(&data, scan_lines, initial), forward(&data, scan_lines));
    }

    #[test]
    fn words_reverse_forward(data in text_strategy(), initial in 1usize..64) {
        prop_assert_eq!(reverse(&data, scan_words, initial), forward(&data, scan_words));
    }

    #[test]
    fn runes_reverse_forward(data in multibyte_strategy(), initial in 1usize..8) {
        prop_assert_eq!(reverse(&data, scan_runes, initial), forward(&data, scan_runes));
    }

    #[test]
    fn multibyte_lines_reverse_forward(data in multibyte_strategy(), initial in 1usize..8) {
        prop_assert_eq!(reverse(&data, scan_lines, initial), forward(&data, scan_lines));
    }
}
