use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use companion_updater::{DeriverSet, HttpFetcher, JsonFileStore, UpdateReport, Updater, UpdaterConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Logging; progress lines are info, so default to that when RUST_LOG is unset
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).finish().try_init();

    match run().await {
        Ok(report) => {
            if report.is_degraded() {
                warn!(
                    fetched = report.fetched,
                    degraded = report.degraded.len(),
                    fallbacks = report.fallbacks.len(),
                    "update finished with degraded sections"
                );
            }
            info!("last updated: {}", report.last_updated);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("update failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<UpdateReport> {
    // Config
    let config = UpdaterConfig::from_env().context("invalid updater configuration")?;
    info!(url = %config.endpoint, file = %config.data_file.display(), "🌐 refreshing data");

    // Init subsystems
    let fetcher = HttpFetcher::new(&config).context("failed to build http client")?;
    let store = JsonFileStore::new(&config.data_file);
    let updater = Updater::new(fetcher, store, DeriverSet::standard());

    Ok(updater.update().await?)
}
