use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub timezone: Option<String>,
    pub tier: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub shutdown_grace_secs: Option<u64>,

    // Defaults for every station
    pub song_interval_secs: Option<u64>,
    pub listeners_interval_secs: Option<u64>,
    pub upload_interval_secs: Option<u64>,
    pub reconnect_delay_secs: Option<u64>,

    pub sink: Option<SinkConfig>,
    /// Keyed by lower-case station name.
    pub stations: BTreeMap<String, StationConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SinkConfig {
    /// "s3", "local" or "memory"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    pub enabled: Option<bool>,
    pub song_url: Option<String>,
    pub listeners_url: Option<String>,
    pub song_interval_secs: Option<u64>,
    pub listeners_interval_secs: Option<u64>,
    pub upload_interval_secs: Option<u64>,
    pub reconnect_delay_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::parse(
            r#"
            port = 8080
            tier = "silver"
            upload_interval_secs = 60

            [sink]
            type = "local"
            dir = "/tmp/radio"

            [stations.rock]
            song_interval_secs = 10

            [stations.jazz]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(8080));
        assert_eq!(config.tier.as_deref(), Some("silver"));
        assert_eq!(config.sink.unwrap().kind.as_deref(), Some("local"));
        assert_eq!(config.stations["rock"].song_interval_secs, Some(10));
        assert_eq!(config.stations["jazz"].enabled, Some(false));
    }

    #[test]
    fn test_unknown_station_field_is_rejected() {
        let result = FileConfig::parse(
            r#"
            [stations.rock]
            song_intervall_secs = 10
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
