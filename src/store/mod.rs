//! Per-year, write-once caches and the source they are filled from.

pub mod stats;
pub mod tables;

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::process::{decode_with, utils::clean_str, DecodeOptions, RawTable};
use crate::schema::CanonicalColumn;

pub use stats::StatsCache;
pub use tables::TableStore;

/// Partition identifier. Only meaningful once checked against the configured
/// set held by a [`TableStore`].
pub type YearKey = i32;

/// Lifecycle of one year within a process. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YearState {
    Unloaded,
    Loaded,
    Summarized,
}

/// Where raw yearly tables come from.
pub trait RawSource: Send + Sync {
    /// `Ok(None)` when no data exists for `year`.
    fn fetch(&self, year: YearKey) -> Result<Option<RawTable>>;
}

/// One delimited file per year under a base directory, named
/// `<kind>_<year>.<ext>`.
#[derive(Debug, Clone)]
pub struct FileSource {
    data_dir: PathBuf,
    dataset_kind: String,
    extension: String,
    options: DecodeOptions,
}

impl FileSource {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        dataset_kind: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            dataset_kind: dataset_kind.into(),
            extension: extension.into(),
            options: DecodeOptions::new()
                .retain_columns(|h| CanonicalColumn::from_alias(clean_str(h)).is_some()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let source = Self::new(&config.data_dir, &config.dataset_kind, &config.extension);
        match config.row_limit {
            Some(limit) => source.with_row_limit(limit),
            None => source,
        }
    }

    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.options = self.options.with_row_limit(limit);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, year: YearKey) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}.{}", self.dataset_kind, year, self.extension))
    }
}

impl RawSource for FileSource {
    fn fetch(&self, year: YearKey) -> Result<Option<RawTable>> {
        let path = self.path_for(year);
        if !path.is_file() {
            return Ok(None);
        }
        decode_with(&path, &self.options).map(Some)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_path_naming() {
        let source = FileSource::new("MICRODADOS", "MICRODADOS_ENEM", "csv");
        assert_eq!(
            source.path_for(2023),
            PathBuf::from("MICRODADOS/MICRODADOS_ENEM_2023.csv")
        );
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let source = FileSource::new(dir.path(), "MICRODADOS_ENEM", "csv");
        assert!(source.fetch(2022).unwrap().is_none());
    }

    #[test]
    fn test_fetch_keeps_only_canonical_columns() {
        let dir = tempdir().unwrap();
        let source = FileSource::new(dir.path(), "MICRODADOS_ENEM", "csv");
        fs::write(
            source.path_for(2024),
            "NU_INSCRICAO;NO_MUNICIPIO_PROVA;NU_NOTA_MT \n1;CAMPINAS;610.2\n2;SANTOS;\n",
        )
        .unwrap();

        let raw = source.fetch(2024).unwrap().unwrap();
        assert_eq!(raw.headers, vec!["NU_INSCRICAO", "NU_NOTA_MT "]);
        assert_eq!(raw.rows.len(), 2);
    }

    #[test]
    fn test_row_limit() {
        let dir = tempdir().unwrap();
        let source = FileSource::new(dir.path(), "MICRODADOS_ENEM", "csv").with_row_limit(1);
        fs::write(source.path_for(2024), "NU_NOTA_MT;NU_NOTA_CN\n1;2\n3;4\n").unwrap();

        let raw = source.fetch(2024).unwrap().unwrap();
        assert_eq!(raw.rows.len(), 1);
    }
}
