//! Provider configuration models and validation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::SecretString;

/// Default per-call timeout, in line with typical inference API latency
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 30_000;

/// Static description of one inference provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
	/// Unique provider identifier (also the credential lookup key)
	pub provider_id: String,
	/// Adapter that speaks this provider's wire protocol
	pub adapter_id: String,
	/// Base endpoint URL
	pub endpoint: String,
	/// Model identifier sent with every request
	pub model: String,
	pub timeout_ms: u64,
	pub enabled: bool,
	/// Extra headers sent with every request
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub headers: Option<HashMap<String, String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl ProviderConfig {
	pub fn new(
		provider_id: impl Into<String>,
		adapter_id: impl Into<String>,
		endpoint: impl Into<String>,
		model: impl Into<String>,
	) -> Self {
		Self {
			provider_id: provider_id.into(),
			adapter_id: adapter_id.into(),
			endpoint: endpoint.into(),
			model: model.into(),
			timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
			enabled: true,
			headers: None,
			name: None,
		}
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Human-readable name, falling back to the provider id
	pub fn display_name(&self) -> &str {
		self.name.as_deref().unwrap_or(&self.provider_id)
	}

	/// Validate the configuration
	pub fn validate(&self) -> Result<(), String> {
		if self.provider_id.trim().is_empty() {
			return Err("provider_id must not be empty".to_string());
		}
		if self.adapter_id.trim().is_empty() {
			return Err(format!(
				"provider '{}' has an empty adapter_id",
				self.provider_id
			));
		}
		if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
			return Err(format!(
				"provider '{}' endpoint must be an http(s) URL, got '{}'",
				self.provider_id, self.endpoint
			));
		}
		if self.model.trim().is_empty() {
			return Err(format!("provider '{}' has an empty model", self.provider_id));
		}
		if self.timeout_ms == 0 {
			return Err(format!(
				"provider '{}' timeout_ms must be greater than zero",
				self.provider_id
			));
		}
		Ok(())
	}
}

/// Everything an adapter needs to perform one call
#[derive(Debug, Clone)]
pub struct ProviderRuntimeConfig {
	pub provider_id: String,
	pub adapter_id: String,
	pub endpoint: String,
	pub model: String,
	pub timeout_ms: u64,
	pub headers: Option<HashMap<String, String>>,
	pub credential: SecretString,
}

impl ProviderRuntimeConfig {
	/// Bind a provider configuration to the credential used for this request
	pub fn new(config: &ProviderConfig, credential: SecretString) -> Self {
		Self {
			provider_id: config.provider_id.clone(),
			adapter_id: config.adapter_id.clone(),
			endpoint: config.endpoint.clone(),
			model: config.model.clone(),
			timeout_ms: config.timeout_ms,
			headers: config.headers.clone(),
			credential,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_provider_defaults() {
		let config = ProviderConfig::new("openai", "openai-chat-v1", "https://api.openai.com/v1", "gpt-4o");
		assert!(config.enabled);
		assert_eq!(config.timeout_ms, DEFAULT_PROVIDER_TIMEOUT_MS);
		assert_eq!(config.display_name(), "openai");
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_validation_failures() {
		let base = ProviderConfig::new("p", "gemini-v1", "https://example.com", "m");

		let mut config = base.clone();
		config.endpoint = "ftp://example.com".to_string();
		assert!(config.validate().is_err());

		let mut config = base.clone();
		config.model = " ".to_string();
		assert!(config.validate().is_err());

		let config = base.clone().with_timeout_ms(0);
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_runtime_config_carries_credential() {
		let config = ProviderConfig::new("p", "gemini-v1", "https://example.com", "m")
			.with_timeout_ms(1500);
		let runtime = ProviderRuntimeConfig::new(&config, SecretString::from("key-1"));
		assert_eq!(runtime.timeout_ms, 1500);
		assert_eq!(runtime.credential.expose_secret(), "key-1");
		assert!(!format!("{:?}", runtime).contains("key-1"));
	}
}
