//! Core adapter trait for provider implementations

use async_trait::async_trait;
use std::fmt::Debug;

use super::{ProviderResult, ProviderRuntimeConfig};
use crate::{AnalysisInput, ProviderReport};

/// Static adapter description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
	pub adapter_id: String,
	pub name: String,
	pub version: String,
}

impl AdapterInfo {
	pub fn new(
		adapter_id: impl Into<String>,
		name: impl Into<String>,
		version: impl Into<String>,
	) -> Self {
		Self {
			adapter_id: adapter_id.into(),
			name: name.into(),
			version: version.into(),
		}
	}
}

/// Wire protocol implementation for one family of inference providers
///
/// An adapter performs exactly one request per `analyze` call, never retries,
/// and converts every failure into a [`ProviderError`](super::ProviderError)
/// tagged with the provider id from `config`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + Debug {
	fn adapter_info(&self) -> &AdapterInfo;

	/// Adapter ID used for registration and provider matching
	fn id(&self) -> &str {
		&self.adapter_info().adapter_id
	}

	/// Send the input to the provider and parse its answer
	async fn analyze(
		&self,
		input: &AnalysisInput,
		config: &ProviderRuntimeConfig,
	) -> ProviderResult<ProviderReport>;

	fn name(&self) -> &str {
		&self.adapter_info().name
	}

	fn version(&self) -> &str {
		&self.adapter_info().version
	}
}
