//! Report how each delimited file would be decoded and projected.
//!
//! Usage: `inspect_csv [FILE_OR_DIR]...` (defaults to the configured data dir).

use anyhow::{Context, Result};
use enemstats::{
    config::Config,
    process::{self, utils::clean_str},
    schema::CanonicalColumn,
};
use glob::glob;
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn collect_inputs(args: &[String], config: &Config) -> Result<Vec<PathBuf>> {
    let roots: Vec<PathBuf> = if args.is_empty() {
        vec![config.data_dir.clone()]
    } else {
        args.iter().map(PathBuf::from).collect()
    };

    let mut files = Vec::new();
    for root in roots {
        if root.is_dir() {
            let pattern = format!("{}/*.{}", root.display(), config.extension);
            for entry in glob(&pattern).with_context(|| format!("bad pattern {pattern}"))? {
                files.push(entry?);
            }
        } else {
            files.push(root);
        }
    }
    files.sort();
    Ok(files)
}

fn inspect(path: &Path) -> Result<()> {
    let raw = process::decode(path)?;
    let recognized: Vec<&str> = raw
        .headers
        .iter()
        .filter_map(|h| CanonicalColumn::from_alias(clean_str(h)))
        .map(|c| c.name())
        .collect();

    println!("{}", path.display());
    println!("  strategy:   {}", raw.strategy);
    println!("  headers:    {}", raw.headers.len());
    println!("  rows:       {} kept, {} skipped", raw.num_rows(), raw.skipped_rows);
    println!(
        "  recognized: {}/{} {:?}",
        recognized.len(),
        CanonicalColumn::ALL.len(),
        recognized
    );
    Ok(())
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let files = collect_inputs(&args, &config)?;
    if files.is_empty() {
        info!("no input files found");
        return Ok(());
    }

    let mut failed = 0;
    for file in &files {
        if let Err(e) = inspect(file) {
            error!(path = %file.display(), error = %e, "inspection failed");
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} files could not be decoded", files.len());
    }
    Ok(())
}
