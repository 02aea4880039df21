//! Runtime configuration: an optional YAML file, then environment overrides.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

/// Names the YAML file to start from. Unset means built-in defaults.
pub const CONFIG_PATH_ENV: &str = "ENEMSTATS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub dataset_kind: String,
    pub extension: String,
    pub years: Vec<i32>,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub warmup: bool,
    pub warmup_timeout_secs: u64,
    /// Cap on data rows read per year; for quick local runs.
    pub row_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("MICRODADOS"),
            dataset_kind: "MICRODADOS_ENEM".to_string(),
            extension: "csv".to_string(),
            years: vec![2022, 2023, 2024],
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            warmup: true,
            warmup_timeout_secs: 600,
            row_limit: None,
        }
    }
}

impl Config {
    /// Defaults, overlaid by the file named in `ENEMSTATS_CONFIG`, overlaid by
    /// individual environment variables.
    pub fn load() -> Result<Self> {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("DATASET_KIND") {
            self.dataset_kind = v;
        }
        if let Some(v) = lookup("YEARS") {
            self.years = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<i32>().with_context(|| format!("YEARS entry {s:?}")))
                .collect::<Result<_>>()?;
        }
        if let Some(v) = lookup("HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.port = v.trim().parse().with_context(|| format!("PORT {v:?}"))?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("WARMUP") {
            self.warmup = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = lookup("WARMUP_TIMEOUT_SECS") {
            self.warmup_timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("WARMUP_TIMEOUT_SECS {v:?}"))?;
        }
        if let Some(v) = lookup("ROW_LIMIT") {
            self.row_limit = Some(v.trim().parse().with_context(|| format!("ROW_LIMIT {v:?}"))?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            bail!("at least one year must be configured");
        }
        if self.dataset_kind.is_empty() {
            bail!("dataset_kind must not be empty");
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("host {:?} is not an IP address", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_secs(self.warmup_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.years, vec![2022, 2023, 2024]);
        assert_eq!(config.socket_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("YEARS", "2023, 2024"),
                ("PORT", "9001"),
                ("WARMUP", "false"),
                ("ROW_LIMIT", "500"),
                ("DATA_DIR", "/data/enem"),
            ]))
            .unwrap();

        assert_eq!(config.years, vec![2023, 2024]);
        assert_eq!(config.port, 9001);
        assert!(!config.warmup);
        assert_eq!(config.row_limit, Some(500));
        assert_eq!(config.data_dir, PathBuf::from("/data/enem"));
        assert_eq!(config.dataset_kind, "MICRODADOS_ENEM");
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let mut config = Config::default();
        assert!(config.apply_overrides(lookup(&[("PORT", "eighty")])).is_err());
        assert!(config.apply_overrides(lookup(&[("YEARS", "2023,x")])).is_err());
    }

    #[test]
    fn test_empty_years_invalid() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("YEARS", " ")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "years: [2021]\nport: 8080\nrow_limit: 1000").unwrap();

        let config = Config::from_file(tmp.path()).unwrap();
        assert_eq!(config.years, vec![2021]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.row_limit, Some(1000));
        assert_eq!(config.extension, "csv");
        assert!(config.warmup);
    }
}
