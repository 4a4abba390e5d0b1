use clap::Parser;
use sicbo::adapters::{start_api_server, FeedClient, PostgresStore};
use sicbo::analysis::{load_dump, run_replay, ReplayConfig};
use sicbo::api::types::PredictionResponse;
use sicbo::cli::{format_replay, Cli, Commands};
use sicbo::config::{AppConfig, LoggingConfig};
use sicbo::error::{Result, SicboError};
use sicbo::persistence::{MemoryStore, PredictionStore};
use sicbo::services::PredictionService;
use sicbo::PredictionEngine;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { port } => {
            let config = load_config(&cli)?;
            init_logging(&config.logging);
            run_serve(config, *port).await?;
        }
        Commands::Predict => {
            init_logging_simple();
            let config = load_config(&cli)?;
            run_predict(config).await?;
        }
        Commands::Replay { file, warmup, json } => {
            init_logging_simple();
            let config = load_config(&cli)?;
            let rows = load_dump(file)?;
            let engine = PredictionEngine::new(&config.engine);
            let cfg = ReplayConfig {
                warmup: *warmup,
                capacity: config.feed.page_size,
            };
            let result = run_replay(&rows, &engine, &cfg);
            if *json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", format_replay(&result));
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let config = AppConfig::load_from(&cli.config_dir)?;
    config
        .validate()
        .map_err(|errors| SicboError::Validation(errors.join("; ")))?;
    Ok(config)
}

async fn connect_store(config: &AppConfig) -> Result<Arc<dyn PredictionStore>> {
    match &config.database.url {
        Some(url) => {
            let store = PostgresStore::new(url, config.database.max_connections).await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("database.url not set, predictions are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_service(config: &AppConfig, store: Arc<dyn PredictionStore>) -> Result<PredictionService> {
    let source = FeedClient::new(config.feed.clone())?;
    Ok(PredictionService::new(
        Arc::new(source),
        store,
        PredictionEngine::new(&config.engine),
        config.feed.page_size,
    ))
}

async fn run_serve(config: AppConfig, port: Option<u16>) -> Result<()> {
    info!(
        game_id = %config.feed.game_id,
        interval_secs = config.refresh.interval_secs,
        "starting sicbo service"
    );

    let store = connect_store(&config).await?;
    let service = Arc::new(build_service(&config, store)?);
    service.restore().await?;

    if let Err(e) = service.refresh().await {
        warn!(error = %e, "initial refresh failed, serving without history");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_task = tokio::spawn(
        service
            .clone()
            .run_refresh_loop(Duration::from_secs(config.refresh.interval_secs), shutdown_rx),
    );

    let port = port.unwrap_or(config.server.port);
    start_api_server(service, port, shutdown_signal()).await?;

    info!("shutting down refresh loop");
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresh_task.await {
        error!("refresh task ended abnormally: {}", e);
    }

    Ok(())
}

async fn run_predict(config: AppConfig) -> Result<()> {
    let service = build_service(&config, Arc::new(MemoryStore::new()))?;
    service.refresh().await?;

    let snapshot = service
        .latest()
        .await
        .ok_or_else(|| SicboError::FeedUnavailable("no history returned".to_string()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&PredictionResponse::from(snapshot))?
    );
    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sicbo=debug,sqlx=warn", config.level)));

    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

fn init_logging_simple() {
    // Minimal logging for CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
