//! Single provider call
//!
//! The invoker is the leaf of the fan-out: it checks its inputs, finds the
//! adapter for the provider, bounds the call by the provider's timeout and
//! turns whatever happens into a [`ProviderOutcome`]. It never panics on bad
//! input and never retries.

use std::sync::Arc;
use std::time::Instant;

use nutriscan_adapters::AdapterRegistry;
use nutriscan_types::{
	AnalysisInput, ProviderError, ProviderReport, ProviderResult, ProviderRuntimeConfig,
};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// A successful report tagged with the provider that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
	pub provider_id: String,
	pub report: ProviderReport,
	pub elapsed_ms: u64,
}

/// Result of one provider call
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
	pub provider_id: String,
	pub elapsed_ms: u64,
	pub result: ProviderResult<ProviderReport>,
}

impl ProviderOutcome {
	pub fn is_success(&self) -> bool {
		self.result.is_ok()
	}

	/// Split into the success or failure half
	pub fn into_result(self) -> Result<SourceReport, ProviderError> {
		let ProviderOutcome {
			provider_id,
			elapsed_ms,
			result,
		} = self;
		result.map(|report| SourceReport {
			provider_id,
			report,
			elapsed_ms,
		})
	}
}

/// Performs exactly one call against one provider
#[derive(Debug, Clone)]
pub struct ProviderInvoker {
	registry: Arc<AdapterRegistry>,
}

impl ProviderInvoker {
	pub fn new(registry: Arc<AdapterRegistry>) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &AdapterRegistry {
		&self.registry
	}

	/// Call the provider described by `config` with `input`
	pub async fn invoke(
		&self,
		input: &AnalysisInput,
		config: &ProviderRuntimeConfig,
	) -> ProviderOutcome {
		let started = Instant::now();
		let result = self.call(input, config).await;
		let elapsed_ms = started.elapsed().as_millis() as u64;

		match &result {
			Ok(report) => debug!(
				"Provider {} returned {} items in {}ms",
				config.provider_id,
				report.items.len(),
				elapsed_ms
			),
			Err(e) => warn!("Provider {} failed after {}ms: {}", config.provider_id, elapsed_ms, e),
		}

		ProviderOutcome {
			provider_id: config.provider_id.clone(),
			elapsed_ms,
			result,
		}
	}

	async fn call(
		&self,
		input: &AnalysisInput,
		config: &ProviderRuntimeConfig,
	) -> ProviderResult<ProviderReport> {
		Self::validate(input, config)?;

		let adapter =
			self.registry
				.get(&config.adapter_id)
				.ok_or_else(|| ProviderError::AdapterNotFound {
					provider_id: config.provider_id.clone(),
					adapter_id: config.adapter_id.clone(),
				})?;

		debug!(
			"Invoking provider {} via adapter {} (model {}, timeout {}ms)",
			config.provider_id, config.adapter_id, config.model, config.timeout_ms
		);

		match timeout(
			Duration::from_millis(config.timeout_ms),
			adapter.analyze(input, config),
		)
		.await
		{
			Ok(result) => result,
			Err(_) => Err(ProviderError::Timeout {
				provider_id: config.provider_id.clone(),
				timeout_ms: config.timeout_ms,
			}),
		}
	}

	fn validate(input: &AnalysisInput, config: &ProviderRuntimeConfig) -> ProviderResult<()> {
		let invalid = |reason: &str| ProviderError::InvalidInput {
			provider_id: config.provider_id.clone(),
			reason: reason.to_string(),
		};

		if config.credential.is_blank() {
			return Err(invalid("credential is empty"));
		}
		if input.is_empty() {
			return Err(invalid("image payload is empty"));
		}
		if config.timeout_ms == 0 {
			return Err(invalid("timeout must be greater than zero"));
		}
		Ok(())
	}
}
