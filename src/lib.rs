pub mod config;
pub mod error;
pub mod process;
pub mod schema;
pub mod server;
pub mod stats;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod testing {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    /// Route `tracing` output through the test harness. Safe to call from
    /// every test; only the first call installs the subscriber.
    pub(crate) fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,enemstats=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
