// src/process/mod.rs
pub mod convert;
pub mod detect;
pub mod utils;

use csv::ReaderBuilder;
use serde::Serialize;
use std::{fmt, fs, path::Path, sync::Arc};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use detect::{delimiter_name, detect_delimiter, TextEncoding};

/// Which (encoding, delimiter) pair produced a [`RawTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DecodeStrategy {
    pub encoding: TextEncoding,
    pub delimiter: u8,
    /// Set when no candidate produced a multi-column header and the fixed
    /// latin-1/comma read was used.
    pub fallback: bool,
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.encoding, delimiter_name(self.delimiter))?;
        if self.fallback {
            f.write_str(" (fallback)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names exactly as decoded; may still carry padding.
    pub headers: Vec<String>,
    /// Each data row, one cell per header.
    pub rows: Vec<Vec<String>>,
    pub strategy: DecodeStrategy,
    /// Rows dropped because their field count disagreed with the header.
    pub skipped_rows: usize,
}

impl RawTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

pub type HeaderFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Knobs for a decode pass.
#[derive(Clone, Default)]
pub struct DecodeOptions {
    retain: Option<HeaderFilter>,
    row_limit: Option<usize>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only materialize columns whose raw header satisfies `keep`.
    pub fn retain_columns<F>(mut self, keep: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.retain = Some(Arc::new(keep));
        self
    }

    /// Stop after `limit` data rows.
    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = Some(limit);
        self
    }
}

impl fmt::Debug for DecodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeOptions")
            .field("retain", &self.retain.is_some())
            .field("row_limit", &self.row_limit)
            .finish()
    }
}

/// Decode a delimited file, keeping every column.
pub fn decode<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    decode_with(path, &DecodeOptions::default())
}

/// Decode `path` by trying each candidate encoding with delimiter detection on
/// the header row, then falling back to a latin-1/comma read.
#[tracing::instrument(level = "info", skip(path, options), fields(path = %path.as_ref().display()))]
pub fn decode_with<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> Result<RawTable> {
    let path = path.as_ref();
    let unreadable = |reason: String| Error::UnreadableFile {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| unreadable(e.to_string()))?;
    let table = decode_bytes(&bytes, options).map_err(unreadable)?;

    info!(
        strategy = %table.strategy,
        columns = table.headers.len(),
        rows = table.rows.len(),
        "decoded"
    );
    if table.skipped_rows > 0 {
        warn!(skipped = table.skipped_rows, "skipped malformed rows");
    }
    Ok(table)
}

/// Strategy selection over an in-memory buffer. The error is the last
/// failure reason seen.
pub fn decode_bytes(bytes: &[u8], options: &DecodeOptions) -> std::result::Result<RawTable, String> {
    let mut last_err = String::from("no candidate encoding produced a multi-column header");

    for encoding in TextEncoding::PRIORITY {
        let Some(text) = encoding.decode(bytes) else {
            debug!(%encoding, "not valid in this encoding");
            continue;
        };
        let Some(delimiter) = detect_delimiter(&text) else {
            debug!(%encoding, "no candidate delimiter on header line");
            continue;
        };
        match header_fields(&text, delimiter) {
            Ok(n) if n > 1 => {
                let strategy = DecodeStrategy {
                    encoding,
                    delimiter,
                    fallback: false,
                };
                match read_table(&text, strategy, options) {
                    Ok(table) => return Ok(table),
                    Err(e) => last_err = e,
                }
            }
            Ok(n) => debug!(%encoding, columns = n, "header did not split"),
            Err(e) => last_err = e,
        }
    }

    warn!(reason = %last_err, "falling back to latin-1/comma");
    let text = encoding_rs::mem::decode_latin1(bytes);
    let strategy = DecodeStrategy {
        encoding: TextEncoding::Latin1,
        delimiter: b',',
        fallback: true,
    };
    read_table(&text, strategy, options)
}

/// Slice of `text` starting at its first non-blank line.
fn from_first_content_line(text: &str) -> &str {
    let mut pos = 0;
    for line in text.split_inclusive('\n') {
        if !utils::clean_str(line).is_empty() {
            return &text[pos..];
        }
        pos += line.len();
    }
    ""
}

fn reader_for(body: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(body.as_bytes())
}

/// Number of fields in the header row under `delimiter`.
fn header_fields(text: &str, delimiter: u8) -> std::result::Result<usize, String> {
    let mut rdr = reader_for(from_first_content_line(text), delimiter);
    rdr.headers()
        .map(|h| h.len())
        .map_err(|e| format!("parsing header: {}", e))
}

fn read_table(
    text: &str,
    strategy: DecodeStrategy,
    options: &DecodeOptions,
) -> std::result::Result<RawTable, String> {
    let mut rdr = reader_for(from_first_content_line(text), strategy.delimiter);
    let header = rdr
        .headers()
        .map_err(|e| format!("parsing header: {}", e))?
        .clone();
    if header.is_empty() || header.iter().all(|h| utils::clean_str(h).is_empty()) {
        return Err("file has no header row".into());
    }

    let keep: Vec<usize> = match &options.retain {
        Some(filter) => header
            .iter()
            .enumerate()
            .filter(|(_, h)| filter(h))
            .map(|(i, _)| i)
            .collect(),
        None => (0..header.len()).collect(),
    };
    let headers: Vec<String> = keep.iter().map(|&i| header[i].to_string()).collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut skipped_rows = 0;
    for (idx, result) in rdr.records().enumerate() {
        if options.row_limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                trace!(record = idx, error = %e, "unparseable row");
                skipped_rows += 1;
                continue;
            }
        };
        if record.len() != header.len() {
            // blank lines carry no data and are not counted as malformed
            if !(record.len() == 1 && utils::clean_str(&record[0]).is_empty()) {
                trace!(record = idx, fields = record.len(), "field count mismatch");
                skipped_rows += 1;
            }
            continue;
        }
        rows.push(keep.iter().map(|&i| record[i].to_string()).collect());
    }

    Ok(RawTable {
        headers,
        rows,
        strategy,
        skipped_rows,
    })
}
