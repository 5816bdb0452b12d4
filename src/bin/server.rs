//! HTTP server binary for taskmate.
//!
//! Usage: `taskmate-server [CONFIG_PATH]`. Without an argument the default
//! config path is used; a missing file means built-in defaults. Secrets can
//! be supplied through `TASKMATE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use taskmate::app::AppState;
use taskmate::channels::run_gateway;
use taskmate::config::{AppConfig, ConfigSeverity, validate_config};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn load_config() -> anyhow::Result<AppConfig> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_config_path);

    let mut config = if path.exists() {
        AppConfig::from_file(&path)?
    } else {
        AppConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Logs go to stderr, plus a daily rolling file when `logging.dir` is set.
/// The returned guard must live until shutdown so buffered lines are flushed.
fn init_tracing(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("taskmate={}", config.logging.level)));

    let (file_layer, guard) = match &config.logging.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "taskmate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    let _log_guard = init_tracing(&config);

    tracing::info!("taskmate v{} starting", env!("CARGO_PKG_VERSION"));
    for issue in validate_config(&config) {
        match issue.severity {
            ConfigSeverity::Error => {
                tracing::error!(id = %issue.id, "{}: {}", issue.title, issue.summary);
            }
            ConfigSeverity::Warning => {
                tracing::warn!(id = %issue.id, "{}: {}", issue.title, issue.summary);
            }
        }
    }

    let state = AppState::from_config(&config)?;

    let _reminder_job = (config.server.scan_interval_secs > 0).then(|| {
        state
            .reminder_job(Duration::from_secs(config.server.scan_interval_secs))
            .run()
    });

    run_gateway(&config.server, state).await.map_err(|e| {
        tracing::error!(error = %e, "gateway exited with error");
        e
    })
}
