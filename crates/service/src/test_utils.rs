//! Scripted adapter used by the unit tests in this crate

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nutriscan_types::{
	AdapterInfo, AnalysisInput, LineItem, ProviderAdapter, ProviderConfig, ProviderError,
	ProviderReport, ProviderResult, ProviderRuntimeConfig, SecretString,
};

pub const SCRIPTED_ADAPTER_ID: &str = "scripted";

/// Per-provider call counter shared with the adapter
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<HashMap<String, usize>>>);

impl CallLog {
	fn record(&self, provider_id: &str) {
		let mut calls = self.0.lock().unwrap();
		*calls.entry(provider_id.to_string()).or_insert(0) += 1;
	}

	pub fn count(&self, provider_id: &str) -> usize {
		self.0.lock().unwrap().get(provider_id).copied().unwrap_or(0)
	}

	pub fn total(&self) -> usize {
		self.0.lock().unwrap().values().sum()
	}
}

/// Adapter whose answer per provider id is fixed up front
#[derive(Debug)]
pub struct ScriptedAdapter {
	info: AdapterInfo,
	responses: HashMap<String, ProviderResult<ProviderReport>>,
	delays_ms: HashMap<String, u64>,
	calls: CallLog,
}

impl ScriptedAdapter {
	pub fn new() -> Self {
		Self {
			info: AdapterInfo::new(SCRIPTED_ADAPTER_ID, "Scripted", "0.0.1"),
			responses: HashMap::new(),
			delays_ms: HashMap::new(),
			calls: CallLog::default(),
		}
	}

	/// Answer with the given `(name, quantity, calories)` items
	pub fn succeed(mut self, provider_id: &str, items: &[(&str, f64, f64)]) -> Self {
		let items = items
			.iter()
			.map(|(name, quantity, calories)| item(name, *quantity, *calories))
			.collect();
		self.responses
			.insert(provider_id.to_string(), Ok(ProviderReport::from_items(items)));
		self
	}

	pub fn fail(mut self, provider_id: &str, error: ProviderError) -> Self {
		self.responses.insert(provider_id.to_string(), Err(error));
		self
	}

	pub fn with_delay(mut self, provider_id: &str, delay_ms: u64) -> Self {
		self.delays_ms.insert(provider_id.to_string(), delay_ms);
		self
	}

	pub fn calls(&self) -> CallLog {
		self.calls.clone()
	}
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
	fn adapter_info(&self) -> &AdapterInfo {
		&self.info
	}

	async fn analyze(
		&self,
		_input: &AnalysisInput,
		config: &ProviderRuntimeConfig,
	) -> ProviderResult<ProviderReport> {
		self.calls.record(&config.provider_id);

		if let Some(delay) = self.delays_ms.get(&config.provider_id) {
			tokio::time::sleep(std::time::Duration::from_millis(*delay)).await;
		}

		self.responses
			.get(&config.provider_id)
			.cloned()
			.unwrap_or_else(|| {
				Err(ProviderError::Transport {
					provider_id: config.provider_id.clone(),
					reason: "no scripted response".to_string(),
				})
			})
	}
}

pub fn item(name: &str, quantity: f64, calories: f64) -> LineItem {
	LineItem::new(name, quantity, "g", calories, 10.0, 1.0, 2.0)
}

pub fn runtime(provider_id: &str) -> ProviderRuntimeConfig {
	let config = ProviderConfig::new(
		provider_id,
		SCRIPTED_ADAPTER_ID,
		"http://127.0.0.1:9",
		"test-model",
	);
	ProviderRuntimeConfig::new(&config, SecretString::from("test-key"))
}

pub fn sample_input() -> AnalysisInput {
	AnalysisInput::new("aGVsbG8=", "image/jpeg")
}

pub fn transport_error(provider_id: &str) -> ProviderError {
	ProviderError::Transport {
		provider_id: provider_id.to_string(),
		reason: "connection refused".to_string(),
	}
}

pub fn parse_error(provider_id: &str) -> ProviderError {
	ProviderError::Parse {
		provider_id: provider_id.to_string(),
		reason: "expected value at line 1 column 1".to_string(),
	}
}
