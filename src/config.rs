use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use logdeck_client::{ClientConfig, NewSource};
use logdeck_engine::EngineConfig;

/// Contents of the TOML config file
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// How often the summary is redrawn when something changed
    pub refresh_ms: u64,

    pub engine: EngineConfig,

    pub client: ClientConfig,

    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 500,
            engine: EngineConfig::default(),
            client: ClientConfig::default(),
            sources: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from a file, or use defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// A `[[sources]]` entry
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub host: String,
    pub log_path: String,
}

impl SourceConfig {
    pub fn to_request(&self) -> NewSource {
        NewSource {
            name: self.name.clone(),
            host: self.host.clone(),
            log_path: self.log_path.clone(),
            ..Default::default()
        }
    }
}

/// Parse a `NAME=PATH` command-line source
pub fn parse_source_arg(arg: &str) -> Result<SourceConfig, String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok(SourceConfig {
            name: name.to_string(),
            host: String::new(),
            log_path: path.to_string(),
        }),
        _ => Err(format!("expected NAME=PATH, got '{}'", arg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::parse(
            r#"
refresh_ms = 250

[engine]
series_capacity = 60
max_logs_per_source = 5000

[client]
poll_interval_ms = 200

[[sources]]
name = "api"
log_path = "/var/log/api.log"

[[sources]]
name = "worker"
host = "worker-1"
log_path = "/var/log/worker.log"
"#,
        )
        .unwrap();

        assert_eq!(config.refresh_ms, 250);
        assert_eq!(config.engine.series_capacity, 60);
        assert_eq!(config.engine.page_size, 50);
        assert_eq!(config.engine.max_logs_per_source, Some(5000));
        assert_eq!(config.client.poll_interval_ms, 200);
        assert_eq!(config.client.initial_lines, 100);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].host, "worker-1");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.refresh_ms, 500);
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_parse_source_arg() {
        let source = parse_source_arg("api=/var/log/api.log").unwrap();
        assert_eq!(source.name, "api");
        assert_eq!(source.log_path, "/var/log/api.log");
        assert_eq!(source.to_request().host, "");

        assert!(parse_source_arg("no-path").is_err());
        assert!(parse_source_arg("=path").is_err());
    }
}
