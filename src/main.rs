//! waze-alerts - relay new Waze traffic alerts to a chat webhook.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use waze_alerts::cli::{Cli, LogFormat};
use waze_alerts::config::{Config, RuntimeConfig};
use waze_alerts::{
    EngineSettings, Fetcher, MetricsServer, PollEngine, Shutdown, StopReason, WebhookNotifier,
    initialize_metrics,
};

/// Initialize the tracing subscriber with the specified log format.
///
/// Level defaults to INFO; `RUST_LOG` refines it.
fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .flatten_event(true)
                .with_env_filter(filter)
                .init();
        }
    }
}

fn main() -> Result<()> {
    // .env must be loaded before clap reads WAZE_ALERTS_CONFIG and LOG_FORMAT
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logging(cli.log_format);

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config_path = cli.config.as_deref();
    match config_path {
        Some(path) => info!(config_path = %path.display(), "Loading configuration"),
        None => info!("No configuration file given, using environment only"),
    }

    let config = match Config::load_with_env(config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    info!("Validating configuration");
    if let Err(errors) = config.validate() {
        for e in &errors {
            error!(error = %e, "Configuration validation error");
        }
        error!(
            error_count = errors.len(),
            "Configuration validation failed"
        );
        std::process::exit(1);
    }

    if cli.validate {
        match config_path {
            Some(path) => println!("Configuration is valid: {}", path.display()),
            None => println!("Configuration is valid (environment only)"),
        }
        println!("  Service name: {}", config.service_name);
        println!("  Sources: {}", config.sources.len());
        for source in &config.sources {
            println!("    - {}", source.id());
        }
        println!("  Poll interval: {}s", config.poll_interval_seconds);
        println!(
            "  Allowed alerts: {}",
            config
                .alerts
                .allowed_on
                .as_ref()
                .map(|on| on.join(", "))
                .unwrap_or_else(|| "all".to_string())
        );
        println!("  Map services: {}", config.map_urls.0.len());
        println!(
            "  Metrics: {} (port {})",
            if config.metrics.enabled {
                "enabled"
            } else {
                "disabled"
            },
            config.metrics.port
        );
        return Ok(());
    }

    let runtime_config = match config.compile() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to compile configuration");
            std::process::exit(1);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        service_name = %runtime_config.service_name,
        "waze-alerts starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(runtime_config))
}

/// Main async entry point.
async fn run(runtime_config: RuntimeConfig) -> Result<()> {
    // One client for feeds and webhook (connection pooling)
    let http_client = reqwest::Client::builder()
        .timeout(runtime_config.http_timeout)
        .build()?;

    let shutdown = Shutdown::new();

    let metrics_handle = if runtime_config.metrics.enabled {
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let server = MetricsServer::with_ready_signal(runtime_config.metrics.port, ready_tx);
        let cancel_metrics = shutdown.token();
        info!(port = runtime_config.metrics.port, "Starting metrics server");
        let handle = tokio::spawn(async move {
            if let Err(e) = server.run(cancel_metrics).await {
                error!(error = %e, "Metrics server error");
            }
        });

        if tokio::time::timeout(Duration::from_secs(2), ready_rx)
            .await
            .is_ok_and(|r| r.is_ok())
        {
            let feed_ids: Vec<&str> = runtime_config
                .sources
                .iter()
                .map(|s| s.id.as_str())
                .collect();
            initialize_metrics(&feed_ids);
        } else {
            warn!("Metrics recorder not ready, initial values skipped");
        }

        Some(handle)
    } else {
        info!("Metrics server disabled");
        None
    };

    let notifier = WebhookNotifier::from_config(
        "webhook",
        &runtime_config.service_name,
        &runtime_config.webhook,
        http_client.clone(),
    )?;

    let settings = EngineSettings::from_runtime(&runtime_config);
    let fetcher = Fetcher::new(http_client, runtime_config.sources);
    let engine = PollEngine::new(settings, fetcher, Arc::new(notifier));

    tokio::spawn(wait_for_signal(shutdown.clone()));

    let reason = engine.run(shutdown.clone()).await;

    // Stops the metrics server if the engine returned on its own
    shutdown.trigger(reason);

    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }

    info!(reason = ?reason, "waze-alerts shutdown complete");
    Ok(())
}

/// Trigger `shutdown` on Ctrl-C (interrupt) or SIGTERM (terminate).
async fn wait_for_signal(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = tokio::select! {
        _ = ctrl_c => StopReason::Interrupt,
        _ = terminate => StopReason::Terminate,
    };

    info!(reason = ?reason, "Received shutdown signal, initiating graceful shutdown");
    shutdown.trigger(reason);
}
