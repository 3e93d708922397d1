use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChirpConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Consumer threads for concurrent mode. Absent means sequential mode.
    #[serde(default)]
    pub consumers: Option<NonZeroUsize>,
    /// Reader cap of the feed lock.
    #[serde(default = "defaults::max_readers")]
    pub max_readers: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn max_readers() -> usize {
        32
    }
}

impl Default for ChirpConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            consumers: None,
            max_readers: defaults::max_readers(),
        }
    }
}

impl ChirpConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml_to_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&toml_to_str)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ChirpConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_readers == 0 {
            return Err(ConfigError::Invalid("max_readers must be at least 1"));
        }
        Ok(())
    }
}
