//! Handles settings for the application. Configuration is read from an
//! optional TOML file (`settings.toml` by default) and then from `SPLITX_*`
//! environment variables; command-line flags override both.
use std::path::PathBuf;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "settings";
const ENV_PREFIX: &str = "SPLITX";

/// How results are printed on stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level for `splitx` and `engine`.
    pub level: String,
    pub format: Format,
    /// Ledger used when `--ledger` is not given.
    pub ledger: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Text,
            ledger: None,
        }
    }
}

impl Settings {
    /// Loads settings from `path` (required when given) or from the optional
    /// default file, then from the environment.
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = File::with_name(path.unwrap_or(DEFAULT_CONFIG_PATH)).required(path.is_some());
        Self::from_builder(
            Config::builder()
                .add_source(file)
                .add_source(Environment::with_prefix(ENV_PREFIX)),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}
