//! Generator configuration: a TOML file layered with `DBCLASSGEN_*` environment variables.

pub mod defaults;
pub mod resolve;
pub mod settings;
pub mod validate;

use std::path::Path;

use ::config as config_rs;
use thiserror::Error;

pub use resolve::Resolved;
pub use settings::{
    DatabaseConfig, EmitConfig, FieldSettings, FieldSettingsOverride, GeneratorConfig,
    LoggingConfig, OutputConfig, RelationsConfig, TableConfig, TableSettings,
    TableSettingsOverride,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config_rs::ConfigError),
    #[error("invalid regex for {key}: {source}")]
    InvalidRegex {
        key: String,
        #[source]
        source: regex::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

impl GeneratorConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config_rs::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config_rs::File::from(path).required(true));
        }
        Self::finish(builder)
    }

    /// Parse TOML text without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let cfg = config_rs::Config::builder()
            .add_source(config_rs::File::from_str(toml, config_rs::FileFormat::Toml))
            .build()?
            .try_deserialize::<Self>()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate::validate(self)
    }

    fn finish(
        builder: config_rs::ConfigBuilder<config_rs::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings = builder
            .add_source(
                config_rs::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg = settings.try_deserialize::<Self>()?;
        cfg.validate()?;
        Ok(cfg)
    }
}
