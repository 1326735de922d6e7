pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod correlator;
pub mod db;
pub mod domain;
pub mod entities;
pub mod error;
pub mod services;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use config::Config;
use state::SharedState;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    run_with_config(config).await
}

pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let prometheus_handle = init_prometheus(&config)?;
    init_logging(&config)?;

    let cli = Cli::parse();
    execute_command(cli, config, prometheus_handle).await
}

fn init_prometheus(
    config: &Config,
) -> anyhow::Result<Option<metrics_exporter_prometheus::PrometheusHandle>> {
    if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("failed to install prometheus recorder")?;
        info!("prometheus metrics recorder initialized");
        Ok(Some(handle))
    } else {
        Ok(None)
    }
}

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let use_json =
        config.observability.loki_enabled || std::env::var("LOG_FORMAT").unwrap_or_default() == "json";

    if use_json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false);

        if config.observability.loki_enabled {
            let url = url::Url::parse(&config.observability.loki_url).context("invalid loki url")?;

            let (loki_layer, task) = tracing_loki::builder()
                .label("app", "waypoint")?
                .extra_field("env", "production")?
                .extra_field("version", env!("CARGO_PKG_VERSION"))?
                .build_url(url)?;

            tokio::spawn(task);
            registry.with(fmt_layer).with(loki_layer).init();
            info!(url = %config.observability.loki_url, "loki logging initialized");
        } else {
            registry.with(fmt_layer).init();
        }
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().pretty();
        registry.with(fmt_layer).init();
    }
    Ok(())
}

async fn execute_command(
    cli: Cli,
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    match cli.command {
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }

        Some(Commands::Daemon) => run_daemon(config, prometheus_handle, true).await,

        Some(Commands::Serve) => run_daemon(config, prometheus_handle, false).await,

        Some(Commands::Check) => run_single_check(config).await,

        Some(Commands::SyncLibrary) => run_library_sync(config).await,

        Some(Commands::Init) => {
            Config::create_default_if_missing()?;
            println!("config file created. edit config.toml and run again.");
            Ok(())
        }
    }
}

/// Spawns the web server plus every background task (spec §5), or — in
/// `Serve`-only mode — just the web server, for operators who run the
/// pollers as a separate process.
async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
    with_background_tasks: bool,
) -> anyhow::Result<()> {
    info!("waypoint v{} starting...", env!("CARGO_PKG_VERSION"));

    let shared = Arc::new(SharedState::new(config.clone()).await?);
    let _ = prometheus_handle;

    let mut handles = Vec::new();

    if with_background_tasks {
        let ctx = shared.ingest_context();
        let anime_service_config = config.anime_service.clone();
        handles.push(tokio::spawn(async move {
            services::anime_hub::run(ctx, anime_service_config.base_url, anime_service_config.api_key).await;
        }));

        let progress_provider = services::progress::ProgressProvider::new(
            shared.store.clone(),
            shared.torrent.clone() as Arc<dyn crate::clients::torrent::TorrentClient>,
            shared.event_bus.clone(),
        )
        .with_intervals(
            Duration::from_secs(config.polling.poll_fast_seconds),
            Duration::from_secs(config.polling.poll_slow_seconds),
        );
        handles.push(tokio::spawn(async move {
            progress_provider.run().await;
        }));

        let verifier = services::verifier::VerifierLoop::new(
            shared.store.clone(),
            shared.media_server.clone() as Arc<dyn crate::clients::media_server::MediaServerClient>,
            shared.event_bus.clone(),
        )
        .with_staleness_window(config.polling.staleness_window_minutes);
        handles.push(tokio::spawn(async move {
            verifier.run().await;
        }));
    }

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let app_state = api::AppState::new(shared.clone());
        let port = config.server.port;
        let app = api::router(app_state).await;
        let addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(port, "starting web server");
        Some(tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!(%err, "web server error");
            }
        }))
    } else {
        None
    };

    info!("waypoint running, press ctrl+c to stop");
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => error!(%err, "error listening for shutdown"),
    }

    for handle in handles {
        handle.abort();
    }
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("waypoint stopped");
    Ok(())
}

async fn run_single_check(config: Config) -> anyhow::Result<()> {
    info!("running a single verifier pass...");
    let shared = SharedState::new(config).await?;
    let verifier = services::verifier::VerifierLoop::new(
        shared.store.clone(),
        shared.media_server.clone() as Arc<dyn crate::clients::media_server::MediaServerClient>,
        shared.event_bus.clone(),
    );
    verifier.tick_once().await?;
    info!("check complete");
    Ok(())
}

async fn run_library_sync(config: Config) -> anyhow::Result<()> {
    info!("running library-sync backfill...");
    let shared = SharedState::new(config).await?;
    let job = services::library_sync::LibrarySyncJob::new(
        shared.store.clone(),
        shared.media_server.clone() as Arc<dyn crate::clients::media_server::MediaServerClient>,
    );
    let report = job.run_backfill().await?;
    info!(created = report.created, skipped = report.skipped, "library-sync backfill complete");
    Ok(())
}
