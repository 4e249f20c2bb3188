use crate::error::{AppError, Result};
use crate::metrics::sampler::SamplerConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_SAMPLES: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(
        default = "default_interval",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub sampling_interval: Duration,

    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    #[serde(default = "default_retain_pause_buffers")]
    pub retain_pause_buffers: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling_interval: default_interval(),
            max_samples: default_max_samples(),
            retain_pause_buffers: default_retain_pause_buffers(),
            export_dir: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampling_interval.is_zero() {
            return Err(AppError::Config(
                "sampling_interval must be greater than zero".to_string(),
            ));
        }
        if self.max_samples == 0 {
            return Err(AppError::Config(
                "max_samples must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: self.sampling_interval,
            max_samples: self.max_samples,
            retain_pause_buffers: self.retain_pause_buffers,
        }
    }
}

fn default_interval() -> Duration {
    DEFAULT_SAMPLING_INTERVAL
}

fn default_max_samples() -> usize {
    DEFAULT_MAX_SAMPLES
}

fn default_retain_pause_buffers() -> bool {
    true
}

fn serialize_duration<S: Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_when_file_is_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sampling_interval, Duration::from_secs(1));
        assert_eq!(config.max_samples, 1000);
    }

    #[test]
    fn test_parse_humantime_interval() {
        let config = Config::from_toml(
            r#"
            sampling_interval = "250ms"
            max_samples = 64
            retain_pause_buffers = false
            export_dir = "/tmp/gcwatch"
            "#,
        )
        .unwrap();

        assert_eq!(config.sampling_interval, Duration::from_millis(250));
        assert_eq!(config.max_samples, 64);
        assert!(!config.retain_pause_buffers);
        assert_eq!(config.export_dir, Some(PathBuf::from("/tmp/gcwatch")));
    }

    #[test]
    fn test_reject_zero_values() {
        assert!(Config::from_toml("max_samples = 0").is_err());
        assert!(Config::from_toml("sampling_interval = \"0s\"").is_err());
        assert!(Config::from_toml("sampling_interval = \"soon\"").is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config {
            sampling_interval: Duration::from_millis(1500),
            ..Config::default()
        };
        let raw = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_toml(&raw).unwrap(), config);
    }
}
