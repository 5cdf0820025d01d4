//! Configuration loading
//!
//! Sources, lowest precedence first: the TOML file, then `NUTRISCAN__*`
//! environment variables (`NUTRISCAN__TIMEOUTS__GLOBAL_MS=20000`).

use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use thiserror::Error;

use crate::settings::{ConfigValidationError, Settings};

pub const DEFAULT_CONFIG_PATH: &str = "config/nutriscan";
pub const ENV_PREFIX: &str = "NUTRISCAN";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
	#[error("Failed to load configuration: {0}")]
	Source(#[from] ConfigError),

	#[error("Invalid configuration: {0}")]
	Validation(#[from] ConfigValidationError),
}

/// Load from `config/nutriscan.toml` if present, plus the environment
pub fn load_config() -> Result<Settings, ConfigLoadError> {
	finish(Config::builder().add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false)))
}

/// Load from an explicit file, which must exist, plus the environment
pub fn load_config_from(path: &str) -> Result<Settings, ConfigLoadError> {
	finish(Config::builder().add_source(File::with_name(path).required(true)))
}

/// Load from inline TOML plus the environment
pub fn load_config_from_str(toml: &str) -> Result<Settings, ConfigLoadError> {
	finish(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}

fn finish(
	builder: ConfigBuilder<config::builder::DefaultState>,
) -> Result<Settings, ConfigLoadError> {
	let settings: Settings = builder
		.add_source(
			Environment::with_prefix(ENV_PREFIX)
				.prefix_separator(ENV_SEPARATOR)
				.separator(ENV_SEPARATOR)
				.try_parsing(true),
		)
		.build()?
		.try_deserialize()?;

	settings.validate()?;
	Ok(settings)
}
