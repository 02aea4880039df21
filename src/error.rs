//! Error taxonomy for the ingestion pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The caller asked for a year that is not configured.
    #[error("year {year} is not available (expected one of {allowed:?})")]
    InvalidYear { year: i32, allowed: Vec<i32> },

    /// Every decode strategy failed for this file.
    #[error("could not decode {}: {reason}", path.display())]
    UnreadableFile { path: PathBuf, reason: String },

    /// The header matched none of the canonical columns.
    #[error("no recognized columns for {year} ({header_count} headers in source)")]
    NoRecognizedColumns { year: i32, header_count: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// True for faults caused by caller input rather than by the data on disk.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Error::InvalidYear { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
