//! Typed settings for the engine and the CLI

use std::collections::HashMap;

use nutriscan_types::{MergeStrategy, ProviderConfig, SecretString, DEFAULT_PROVIDER_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::configurable_value::{ConfigurableValue, ConfigurableValueError};

pub const DEFAULT_GLOBAL_TIMEOUT_MS: u64 = 45_000;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
	/// Providers used in the concurrent fan-out, keyed by provider id
	#[serde(default)]
	pub providers: HashMap<String, ProviderSettings>,
	/// Centralized provider called once when the fan-out yields nothing
	#[serde(default)]
	pub fallback: Option<ProviderSettings>,
	#[serde(default)]
	pub timeouts: TimeoutSettings,
	#[serde(default)]
	pub aggregation: AggregationSettings,
	#[serde(default)]
	pub logging: LoggingSettings,
	#[serde(default)]
	pub security: SecuritySettings,
}

/// One provider as written in the config file
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderSettings {
	/// Defaults to the map key for fan-out providers
	#[serde(default)]
	pub provider_id: String,
	pub adapter_id: String,
	pub endpoint: String,
	pub model: String,
	/// Overrides `timeouts.per_provider_ms`
	#[serde(default)]
	pub timeout_ms: Option<u64>,
	#[serde(default = "default_enabled")]
	pub enabled: bool,
	/// Used when the request does not carry a credential for this provider
	#[serde(default)]
	pub credential: Option<ConfigurableValue>,
	#[serde(default)]
	pub headers: Option<HashMap<String, String>>,
	#[serde(default)]
	pub name: Option<String>,
}

fn default_enabled() -> bool {
	true
}

impl ProviderSettings {
	fn to_provider_config(&self, provider_id: &str, default_timeout_ms: u64) -> ProviderConfig {
		let mut config = ProviderConfig::new(
			provider_id,
			self.adapter_id.clone(),
			self.endpoint.clone(),
			self.model.clone(),
		)
		.with_timeout_ms(self.timeout_ms.unwrap_or(default_timeout_ms));
		config.enabled = self.enabled;
		config.headers = self.headers.clone();
		config.name = self.name.clone();
		config
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimeoutSettings {
	/// Bound on each provider call
	pub per_provider_ms: u64,
	/// Bound on the whole fan-out
	pub global_ms: u64,
}

impl Default for TimeoutSettings {
	fn default() -> Self {
		Self {
			per_provider_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
			global_ms: DEFAULT_GLOBAL_TIMEOUT_MS,
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AggregationSettings {
	#[serde(default)]
	pub merge_strategy: MergeStrategy,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
	/// Include targets and thread ids
	#[serde(default)]
	pub structured: bool,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
			structured: false,
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SecuritySettings {
	/// Signing keys by identity name
	///
	/// ```toml
	/// [security.signing_keys]
	/// ops = { type = "env", value = "NUTRISCAN_OPS_SIGNING_KEY" }
	/// ```
	#[serde(default)]
	pub signing_keys: HashMap<String, ConfigurableValue>,
	/// Identity used when `initialize` is called without one
	#[serde(default)]
	pub default_signing_identity: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
	#[error("Invalid provider '{provider_id}': {reason}")]
	InvalidProvider { provider_id: String, reason: String },

	#[error("Invalid timeout: {0}")]
	InvalidTimeout(String),

	#[error("Unknown signing identity '{0}'")]
	UnknownSigningIdentity(String),

	#[error("Unresolvable secret: {0}")]
	Secret(#[from] ConfigurableValueError),
}

impl Settings {
	/// Enabled fan-out providers, sorted by id
	pub fn enabled_providers(&self) -> Vec<ProviderConfig> {
		let mut providers: Vec<ProviderConfig> = self
			.providers
			.iter()
			.filter(|(_, settings)| settings.enabled)
			.map(|(key, settings)| {
				settings.to_provider_config(
					Self::provider_id_for(key, settings),
					self.timeouts.per_provider_ms,
				)
			})
			.collect();
		providers.sort_by(|a, b| a.provider_id.cmp(&b.provider_id));
		providers
	}

	/// The fallback provider, if configured and enabled
	pub fn fallback_provider(&self) -> Option<ProviderConfig> {
		self.fallback
			.as_ref()
			.filter(|settings| settings.enabled)
			.map(|settings| {
				settings.to_provider_config(&settings.provider_id, self.timeouts.per_provider_ms)
			})
	}

	/// Credential configured for a provider, if any
	pub fn configured_credential(
		&self,
		provider_id: &str,
	) -> Result<Option<SecretString>, ConfigurableValueError> {
		let from_providers = self
			.providers
			.iter()
			.find(|(key, settings)| Self::provider_id_for(key, settings) == provider_id)
			.map(|(_, settings)| settings);
		let from_fallback = self
			.fallback
			.as_ref()
			.filter(|settings| settings.provider_id == provider_id);

		match from_providers
			.or(from_fallback)
			.and_then(|settings| settings.credential.as_ref())
		{
			Some(value) => value.resolve_for_secret().map(Some),
			None => Ok(None),
		}
	}

	/// Resolve the key for a signing identity
	pub fn signing_key(&self, identity: &str) -> Result<SecretString, ConfigValidationError> {
		let value = self
			.security
			.signing_keys
			.get(identity)
			.ok_or_else(|| ConfigValidationError::UnknownSigningIdentity(identity.to_string()))?;
		Ok(value.resolve_for_secret()?)
	}

	/// Structural checks; secrets are resolved lazily and not checked here
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		if self.timeouts.per_provider_ms == 0 {
			return Err(ConfigValidationError::InvalidTimeout(
				"timeouts.per_provider_ms must be greater than zero".to_string(),
			));
		}
		if self.timeouts.global_ms == 0 {
			return Err(ConfigValidationError::InvalidTimeout(
				"timeouts.global_ms must be greater than zero".to_string(),
			));
		}

		for provider in self.enabled_providers() {
			provider
				.validate()
				.map_err(|reason| ConfigValidationError::InvalidProvider {
					provider_id: provider.provider_id.clone(),
					reason,
				})?;
		}

		if let Some(fallback) = &self.fallback {
			if fallback.provider_id.trim().is_empty() {
				return Err(ConfigValidationError::InvalidProvider {
					provider_id: "fallback".to_string(),
					reason: "fallback.provider_id is required".to_string(),
				});
			}
			if let Some(config) = self.fallback_provider() {
				config
					.validate()
					.map_err(|reason| ConfigValidationError::InvalidProvider {
						provider_id: config.provider_id.clone(),
						reason,
					})?;
			}
		}

		if let Some(identity) = &self.security.default_signing_identity {
			if !self.security.signing_keys.contains_key(identity) {
				return Err(ConfigValidationError::UnknownSigningIdentity(identity.clone()));
			}
		}

		Ok(())
	}

	fn provider_id_for<'a>(key: &'a str, settings: &'a ProviderSettings) -> &'a str {
		if settings.provider_id.trim().is_empty() {
			key
		} else {
			&settings.provider_id
		}
	}
}
