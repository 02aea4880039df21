use encoding_rs::{UTF_8, WINDOWS_1252};
use serde::Serialize;
use std::{borrow::Cow, fmt};

use crate::process::utils::clean_str;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Plausible field separators, in tie-break order.
pub const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Text encodings tried while decoding a source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Windows1252,
}

impl TextEncoding {
    /// Candidates in the order they are attempted.
    pub const PRIORITY: [TextEncoding; 3] = [
        TextEncoding::Utf8,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Decode `bytes` strictly, or `None` if they are not valid in this encoding.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            TextEncoding::Utf8 => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                UTF_8.decode_without_bom_handling_and_without_replacement(body)
            }
            // ISO-8859-1 maps every byte, so this never fails.
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes)),
            TextEncoding::Windows1252 => {
                WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First line with any content after trimming.
pub fn first_non_empty_line(text: &str) -> Option<&str> {
    text.lines().find(|l| !clean_str(l).is_empty())
}

/// Count `delimiter` occurrences outside double-quoted sections.
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Pick the most frequent candidate delimiter on the first non-empty line.
/// Ties go to the earlier candidate in [`DELIMITERS`]; `None` if none occurs.
pub fn detect_delimiter(text: &str) -> Option<u8> {
    let line = first_non_empty_line(text)?;
    let mut best: Option<(u8, usize)> = None;
    for d in DELIMITERS {
        let n = count_unquoted(line, d);
        if n > 0 && best.map_or(true, |(_, top)| n > top) {
            best = Some((d, n));
        }
    }
    best.map(|(d, _)| d)
}

/// Printable name for a delimiter byte.
pub fn delimiter_name(delimiter: u8) -> &'static str {
    match delimiter {
        b',' => "comma",
        b';' => "semicolon",
        b'\t' => "tab",
        _ => "other",
    }
}
