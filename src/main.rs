use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use radio_ingest::config::{self, AppConfig, FileConfig, SinkKind};
use radio_ingest::server::{self, metrics, ServerConfig};
use radio_ingest::{ObjectStoreSink, RequestsLoggingLevel, StationId, Supervisor};

#[derive(Parser, Debug)]
#[command(version = env!("APP_VERSION"))]
struct CliArgs {
    /// Path to a TOML config file. Its values override the arguments below.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// The port the webhook server listens on.
    #[clap(short, long, default_value_t = 8001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each webhook request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Stations to run, comma separated. All of them when omitted.
    #[clap(long, value_delimiter = ',')]
    pub stations: Vec<StationId>,

    /// Time zone of `recorded_at` and of upload keys.
    #[clap(long, default_value = "Europe/Bratislava")]
    pub timezone: String,

    /// First segment of every upload key.
    #[clap(long, default_value = "bronze")]
    pub tier: String,

    #[clap(long, default_value_t = config::DEFAULT_SONG_INTERVAL_SECS)]
    pub song_interval_secs: u64,

    #[clap(long, default_value_t = config::DEFAULT_LISTENERS_INTERVAL_SECS)]
    pub listeners_interval_secs: u64,

    #[clap(long, default_value_t = config::DEFAULT_UPLOAD_INTERVAL_SECS)]
    pub upload_interval_secs: u64,

    /// Wait after a stream disconnect before reconnecting.
    #[clap(long, default_value_t = config::DEFAULT_RECONNECT_DELAY_SECS)]
    pub reconnect_delay_secs: u64,

    /// Timeout of each poll request.
    #[clap(long, default_value_t = 5)]
    pub request_timeout_secs: u64,

    /// How long shutdown waits for running tasks.
    #[clap(long, default_value_t = 10)]
    pub shutdown_grace_secs: u64,

    /// Where uploaded batches go.
    #[clap(long, value_enum, default_value = "s3")]
    pub sink: SinkKind,

    #[clap(long, env = "R2_ENDPOINT")]
    pub r2_endpoint: Option<String>,

    #[clap(long, env = "R2_KEY_ID", hide_env_values = true)]
    pub r2_key_id: Option<String>,

    #[clap(long, env = "R2_SECRET", hide_env_values = true)]
    pub r2_secret: Option<String>,

    #[clap(long, env = "R2_BUCKET")]
    pub r2_bucket: Option<String>,

    #[clap(long, env = "R2_REGION", default_value = "auto")]
    pub r2_region: String,

    /// Directory of the `local` sink.
    #[clap(long)]
    pub local_dir: Option<PathBuf>,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            timezone: args.timezone.clone(),
            tier: args.tier.clone(),
            request_timeout_secs: args.request_timeout_secs,
            shutdown_grace_secs: args.shutdown_grace_secs,
            stations: args.stations.clone(),
            song_interval_secs: args.song_interval_secs,
            listeners_interval_secs: args.listeners_interval_secs,
            upload_interval_secs: args.upload_interval_secs,
            reconnect_delay_secs: args.reconnect_delay_secs,
            sink: args.sink,
            r2_endpoint: args.r2_endpoint.clone(),
            r2_key_id: args.r2_key_id.clone(),
            r2_secret: args.r2_secret.clone(),
            r2_bucket: args.r2_bucket.clone(),
            r2_region: args.r2_region.clone(),
            local_dir: args.local_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets usually come from a .env file next to the binary.
    let dotenv = dotenvy::dotenv();

    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    match dotenv {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => {}
        Err(e) => error!("Failed to load .env file: {}", e),
    }

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&(&cli_args).into(), file_config)?;

    info!(
        "radio-ingest {} ({}) starting {} stations",
        env!("APP_VERSION"),
        env!("GIT_HASH"),
        app_config.stations.len()
    );

    info!("Initializing metrics...");
    metrics::init_metrics();

    let sink = Arc::new(
        ObjectStoreSink::from_settings(&app_config.sink).context("Failed to create upload sink")?,
    );
    let client = reqwest::Client::builder()
        .timeout(app_config.request_timeout)
        .build()
        .context("Failed to create HTTP client")?;

    let supervisor = Arc::new(Supervisor::new(&app_config, sink, client));
    supervisor.start_all();

    let shutdown = CancellationToken::new();
    let server_config = ServerConfig::from(&app_config);
    let metrics_port = server_config.metrics_port;

    let mut webhook_server = tokio::spawn(server::run_server(
        server_config,
        supervisor.clone(),
        shutdown.clone(),
    ));
    let metrics_server = tokio::spawn(server::run_metrics_server(metrics_port, shutdown.clone()));

    let result = tokio::select! {
        joined = &mut webhook_server => {
            let result = joined.context("Webhook server task panicked").and_then(|r| r);
            error!("Webhook server stopped: {:?}", result);
            result
        }
        signal = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            signal.context("Failed to listen for Ctrl+C")
        }
    };

    shutdown.cancel();
    supervisor.shutdown(app_config.shutdown_grace).await;

    let grace = app_config.shutdown_grace.max(Duration::from_secs(1));
    for (name, task) in [("webhook", webhook_server), ("metrics", metrics_server)] {
        if task.is_finished() || tokio::time::timeout(grace, task).await.is_ok() {
            continue;
        }
        error!("The {} server did not stop in time", name);
    }

    result
}
