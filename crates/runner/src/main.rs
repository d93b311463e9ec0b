//! Runner entry point.

use std::process::ExitCode;

use runner::{Config, LogFormat, Report, RunnerError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &Config) {
    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn print(report: &Report) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(%err, "failed to serialize report"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|err| tracing::warn!(%err, "metrics recorder not installed"))
        .ok();

    // 3. Run the saga
    let outcome = runner::run(&config).await;

    if let Some(handle) = &metrics_handle {
        tracing::debug!(metrics = %handle.render(), "saga metrics");
    }

    // 4. Report
    match outcome {
        Ok(result) => {
            print(&Report::succeeded(result));
            ExitCode::SUCCESS
        }
        Err(RunnerError::Saga(err)) => {
            tracing::error!(error = %err, "create-products rolled back");
            print(&Report::failed(&err));
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!(error = %err, "create-products could not run");
            ExitCode::from(2)
        }
    }
}
