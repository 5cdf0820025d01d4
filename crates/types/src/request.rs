//! Caller-supplied request data

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{ProviderRuntimeConfig, SecretString};

/// The analytical input: one base64-encoded image plus an optional instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInput {
	/// Base64 image data, without a `data:` prefix
	pub image_base64: String,
	/// MIME type of the image, e.g. `image/jpeg`
	pub mime_type: String,
	/// Overrides the default instruction sent to providers
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub instruction: Option<String>,
}

impl AnalysisInput {
	pub fn new(image_base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
		Self {
			image_base64: image_base64.into(),
			mime_type: mime_type.into(),
			instruction: None,
		}
	}

	pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
		self.instruction = Some(instruction.into());
		self
	}

	/// True when there is no image payload to analyze
	pub fn is_empty(&self) -> bool {
		self.image_base64.trim().is_empty()
	}

	/// `data:` URL form of the image
	pub fn data_url(&self) -> String {
		format!("data:{};base64,{}", self.mime_type, self.image_base64)
	}
}

/// Credentials keyed by provider id
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
	credentials: HashMap<String, SecretString>,
}

impl CredentialSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add or replace the credential for a provider
	pub fn with(mut self, provider_id: impl Into<String>, credential: impl Into<SecretString>) -> Self {
		self.insert(provider_id, credential);
		self
	}

	pub fn insert(&mut self, provider_id: impl Into<String>, credential: impl Into<SecretString>) {
		self.credentials.insert(provider_id.into(), credential.into());
	}

	pub fn get(&self, provider_id: &str) -> Option<&SecretString> {
		self.credentials.get(provider_id)
	}

	pub fn len(&self) -> usize {
		self.credentials.len()
	}

	pub fn is_empty(&self) -> bool {
		self.credentials.is_empty()
	}
}

/// Immutable context for one analysis invocation
#[derive(Debug, Clone)]
pub struct RequestContext {
	pub request_id: String,
	pub input: AnalysisInput,
	/// Providers to dispatch concurrently, credentials bound
	pub providers: Vec<ProviderRuntimeConfig>,
	/// Designated centralized provider used when the fan-out yields nothing
	pub fallback: Option<ProviderRuntimeConfig>,
	/// Identity to sign the result with, if any
	pub signing_identity: Option<String>,
}

impl RequestContext {
	pub fn new(request_id: impl Into<String>, input: AnalysisInput) -> Self {
		Self {
			request_id: request_id.into(),
			input,
			providers: Vec::new(),
			fallback: None,
			signing_identity: None,
		}
	}

	pub fn with_provider(mut self, provider: ProviderRuntimeConfig) -> Self {
		self.providers.push(provider);
		self
	}

	pub fn with_fallback(mut self, fallback: ProviderRuntimeConfig) -> Self {
		self.fallback = Some(fallback);
		self
	}

	pub fn with_signing_identity(mut self, identity: impl Into<String>) -> Self {
		self.signing_identity = Some(identity.into());
		self
	}
}
