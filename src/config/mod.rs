mod file_config;

pub use file_config::{FileConfig, SinkConfig, StationConfig};

use crate::server::RequestsLoggingLevel;
use crate::stations::{Source, StationId};
use anyhow::{anyhow, bail, Result};
use chrono_tz::Tz;
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SONG_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_LISTENERS_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_UPLOAD_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    S3,
    Local,
    Memory,
}

/// CLI arguments that can be used for config resolution.
/// TOML values override these where present.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub timezone: String,
    pub tier: String,
    pub request_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    /// Empty means every built-in station.
    pub stations: Vec<StationId>,
    pub song_interval_secs: u64,
    pub listeners_interval_secs: u64,
    pub upload_interval_secs: u64,
    pub reconnect_delay_secs: u64,
    pub sink: SinkKind,
    pub r2_endpoint: Option<String>,
    pub r2_key_id: Option<String>,
    pub r2_secret: Option<String>,
    pub r2_bucket: Option<String>,
    pub r2_region: String,
    pub local_dir: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            port: 8001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            timezone: crate::clock::DEFAULT_TIMEZONE.name().to_string(),
            tier: "bronze".to_string(),
            request_timeout_secs: 5,
            shutdown_grace_secs: 10,
            stations: Vec::new(),
            song_interval_secs: DEFAULT_SONG_INTERVAL_SECS,
            listeners_interval_secs: DEFAULT_LISTENERS_INTERVAL_SECS,
            upload_interval_secs: DEFAULT_UPLOAD_INTERVAL_SECS,
            reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
            sink: SinkKind::S3,
            r2_endpoint: None,
            r2_key_id: None,
            r2_secret: None,
            r2_bucket: None,
            r2_region: "auto".to_string(),
            local_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub timezone: Tz,
    pub tier: String,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
    pub sink: SinkSettings,
    pub stations: Vec<StationSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSettings {
    S3 {
        endpoint: String,
        bucket: String,
        access_key_id: String,
        secret_access_key: String,
        region: String,
    },
    Local {
        dir: PathBuf,
    },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSettings {
    Poll {
        url: String,
        interval: Duration,
    },
    Stream {
        url: String,
        pacing: Option<Duration>,
        reconnect_delay: Duration,
    },
    Webhook {
        paths: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationSettings {
    pub station: StationId,
    pub song: TransportSettings,
    pub listeners: TransportSettings,
    pub upload_interval: Duration,
}

impl StationSettings {
    /// Built-in endpoints with the given intervals.
    pub fn with_defaults(
        station: StationId,
        song_interval: Duration,
        listeners_interval: Duration,
        upload_interval: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        let profile = station.profile();
        let song = transport(profile.song_source, None, song_interval, None, reconnect_delay);
        let pacing = profile.stream_paced.then_some(listeners_interval);
        let listeners = transport(
            profile.listeners_source,
            None,
            listeners_interval,
            pacing,
            reconnect_delay,
        );
        Self {
            station,
            song,
            listeners,
            upload_interval,
        }
    }
}

fn transport(
    source: Source,
    url_override: Option<String>,
    interval: Duration,
    pacing: Option<Duration>,
    reconnect_delay: Duration,
) -> TransportSettings {
    match source {
        Source::Poll { url } => TransportSettings::Poll {
            url: url_override.unwrap_or_else(|| url.to_string()),
            interval,
        },
        Source::Stream { url } => TransportSettings::Stream {
            url: url_override.unwrap_or_else(|| url.to_string()),
            pacing,
            reconnect_delay,
        },
        Source::Webhook { paths } => TransportSettings::Webhook {
            paths: paths.iter().map(|p| p.to_string()).collect(),
        },
    }
}

fn positive_secs(name: &str, value: u64) -> Result<Duration> {
    if value == 0 {
        bail!("{} must be greater than zero", name);
    }
    Ok(Duration::from_secs(value))
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let timezone_name = file.timezone.unwrap_or_else(|| cli.timezone.clone());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow!("Invalid timezone '{}': {}", timezone_name, e))?;

        let tier = file.tier.unwrap_or_else(|| cli.tier.clone());
        if tier.is_empty() || tier.contains('/') {
            bail!("tier must be a single non-empty path segment, got '{}'", tier);
        }

        let request_timeout = positive_secs(
            "request_timeout_secs",
            file.request_timeout_secs.unwrap_or(cli.request_timeout_secs),
        )?;
        let shutdown_grace = Duration::from_secs(
            file.shutdown_grace_secs.unwrap_or(cli.shutdown_grace_secs),
        );

        let song_interval_secs = file.song_interval_secs.unwrap_or(cli.song_interval_secs);
        let listeners_interval_secs = file
            .listeners_interval_secs
            .unwrap_or(cli.listeners_interval_secs);
        let upload_interval_secs = file.upload_interval_secs.unwrap_or(cli.upload_interval_secs);
        let reconnect_delay_secs = file.reconnect_delay_secs.unwrap_or(cli.reconnect_delay_secs);

        let sink = resolve_sink(cli, file.sink.unwrap_or_default())?;

        // Every [stations.*] table must name a built-in station.
        let mut overrides = Vec::with_capacity(file.stations.len());
        for (name, station_config) in file.stations {
            let id: StationId = name
                .parse()
                .map_err(|e| anyhow!("Invalid [stations.{}] section: {}", name, e))?;
            overrides.push((id, station_config));
        }

        let mut stations = Vec::new();
        for id in StationId::ALL {
            let station_file = overrides
                .iter()
                .find(|(candidate, _)| *candidate == id)
                .map(|(_, config)| config.clone())
                .unwrap_or_default();

            let enabled_by_cli = cli.stations.is_empty() || cli.stations.contains(&id);
            if !station_file.enabled.unwrap_or(enabled_by_cli) {
                continue;
            }

            stations.push(resolve_station(
                id,
                station_file,
                song_interval_secs,
                listeners_interval_secs,
                upload_interval_secs,
                reconnect_delay_secs,
            )?);
        }

        if stations.is_empty() {
            bail!("No station is enabled");
        }

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            timezone,
            tier,
            request_timeout,
            shutdown_grace,
            sink,
            stations,
        })
    }
}

fn resolve_station(
    id: StationId,
    file: StationConfig,
    song_interval_secs: u64,
    listeners_interval_secs: u64,
    upload_interval_secs: u64,
    reconnect_delay_secs: u64,
) -> Result<StationSettings> {
    let key = id.key();
    let profile = id.profile();

    let song_interval = positive_secs(
        &format!("{}.song_interval_secs", key),
        file.song_interval_secs.unwrap_or(song_interval_secs),
    )?;
    let listeners_interval = positive_secs(
        &format!("{}.listeners_interval_secs", key),
        file.listeners_interval_secs.unwrap_or(listeners_interval_secs),
    )?;
    let upload_interval = positive_secs(
        &format!("{}.upload_interval_secs", key),
        file.upload_interval_secs.unwrap_or(upload_interval_secs),
    )?;
    let reconnect_delay = positive_secs(
        &format!("{}.reconnect_delay_secs", key),
        file.reconnect_delay_secs.unwrap_or(reconnect_delay_secs),
    )?;

    if file.song_url.is_some() && matches!(profile.song_source, Source::Webhook { .. }) {
        bail!("{} receives songs via webhook; song_url does not apply", key);
    }
    if file.listeners_url.is_some() && matches!(profile.listeners_source, Source::Webhook { .. }) {
        bail!("{} receives listeners via webhook; listeners_url does not apply", key);
    }

    let pacing = profile.stream_paced.then_some(listeners_interval);
    Ok(StationSettings {
        station: id,
        song: transport(
            profile.song_source,
            file.song_url,
            song_interval,
            None,
            reconnect_delay,
        ),
        listeners: transport(
            profile.listeners_source,
            file.listeners_url,
            listeners_interval,
            pacing,
            reconnect_delay,
        ),
        upload_interval,
    })
}

fn resolve_sink(cli: &CliConfig, file: SinkConfig) -> Result<SinkSettings> {
    let kind = match file.kind {
        Some(kind) => SinkKind::from_str(&kind, true)
            .map_err(|_| anyhow!("Invalid sink type '{}'; expected s3, local or memory", kind))?,
        None => cli.sink,
    };

    match kind {
        SinkKind::S3 => {
            let endpoint = file.endpoint.or_else(|| cli.r2_endpoint.clone());
            let bucket = file.bucket.or_else(|| cli.r2_bucket.clone());
            let access_key_id = file.access_key_id.or_else(|| cli.r2_key_id.clone());
            let secret_access_key = file.secret_access_key.or_else(|| cli.r2_secret.clone());
            let (Some(endpoint), Some(bucket), Some(access_key_id), Some(secret_access_key)) =
                (endpoint, bucket, access_key_id, secret_access_key)
            else {
                bail!(
                    "The s3 sink needs an endpoint, bucket, access key id and secret \
                     (R2_ENDPOINT, R2_BUCKET, R2_KEY_ID, R2_SECRET or the [sink] section)"
                );
            };
            Ok(SinkSettings::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region: file.region.unwrap_or_else(|| cli.r2_region.clone()),
            })
        }
        SinkKind::Local => {
            let dir = file
                .dir
                .map(PathBuf::from)
                .or_else(|| cli.local_dir.clone())
                .ok_or_else(|| {
                    anyhow!("The local sink needs a directory via --local-dir or [sink] dir")
                })?;
            Ok(SinkSettings::Local { dir })
        }
        SinkKind::Memory => Ok(SinkSettings::Memory),
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
