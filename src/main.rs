use anyhow::{Context, Result};
use enemstats::{
    config::Config,
    server,
    store::{FileSource, RawSource, StatsCache, TableStore},
};
use std::sync::Arc;
use tokio::{task, time::timeout};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) config & logging ─────────────────────────────────────────
    let config = Config::load().context("loading configuration")?;
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!(
        data_dir = %config.data_dir.display(),
        years = ?config.years,
        row_limit = ?config.row_limit,
        "startup"
    );

    // ─── 2) caches ───────────────────────────────────────────────────
    let source = FileSource::from_config(&config);
    for &year in &config.years {
        let path = source.path_for(year);
        if !path.is_file() {
            warn!(year, path = %path.display(), "year file not found; it will serve empty stats");
        }
    }
    let source: Arc<dyn RawSource> = Arc::new(source);
    let tables = Arc::new(TableStore::new(config.years.iter().copied(), source));
    let cache = Arc::new(StatsCache::new(tables));

    // ─── 3) warm every year before accepting traffic ─────────────────
    if config.warmup {
        let warm = {
            let cache = Arc::clone(&cache);
            task::spawn_blocking(move || cache.warm())
        };
        match timeout(config.warmup_timeout(), warm).await {
            Ok(Ok(with_rows)) => info!(with_rows, "caches warm"),
            Ok(Err(e)) => warn!(error = %e, "warmup task failed; years load on demand"),
            Err(_) => warn!(
                secs = config.warmup_timeout_secs,
                "warmup timed out; remaining years load on demand"
            ),
        }
    }

    // ─── 4) serve ────────────────────────────────────────────────────
    let addr = config.socket_addr()?;
    info!("listening on http://{}", addr);
    info!("health check: http://{}/health", addr);
    warp::serve(server::routes(cache)).run(addr).await;

    Ok(())
}
