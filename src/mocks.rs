//! Mock provider adapters for demos and testing
//!
//! [`MockProviderAdapter`] answers per provider id with canned model output,
//! which still goes through the real response parser, so malformed and empty
//! answers fail exactly like they would over HTTP.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nutriscan_adapters::parse_report;
use nutriscan_config::{ConfigurableValue, ProviderSettings, Settings};
use nutriscan_types::{
	serde_json::json, AdapterInfo, AnalysisInput, LineItem, ProviderAdapter, ProviderConfig,
	ProviderError, ProviderReport, ProviderResult, ProviderRuntimeConfig,
};

pub const MOCK_ADAPTER_ID: &str = "mock-v1";

/// What a mocked provider does when called
#[derive(Debug, Clone)]
pub enum MockBehavior {
	/// Return these items (totals are recomputed)
	Items(Vec<LineItem>),
	/// Return this text as the model output
	RawOutput(String),
	/// Fail at the transport level
	TransportFailure,
	/// Answer with text that is not JSON
	Malformed,
	/// Answer with an empty item list
	Empty,
}

impl MockBehavior {
	fn respond(&self, provider_id: &str) -> ProviderResult<ProviderReport> {
		match self {
			MockBehavior::Items(items) => {
				let body = json!({ "items": items }).to_string();
				parse_report(provider_id, &body)
			},
			MockBehavior::RawOutput(text) => parse_report(provider_id, text),
			MockBehavior::TransportFailure => Err(ProviderError::Transport {
				provider_id: provider_id.to_string(),
				reason: "connection reset by peer".to_string(),
			}),
			MockBehavior::Malformed => {
				parse_report(provider_id, "Sorry, I could not analyze this meal.")
			},
			MockBehavior::Empty => parse_report(provider_id, r#"{"items": []}"#),
		}
	}
}

/// Scriptable adapter with call tracking and artificial latency
#[derive(Debug, Clone)]
pub struct MockProviderAdapter {
	info: AdapterInfo,
	behaviors: HashMap<String, MockBehavior>,
	default_behavior: MockBehavior,
	delays_ms: HashMap<String, u64>,
	total_calls: Arc<AtomicUsize>,
	calls_by_provider: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockProviderAdapter {
	/// Mock under the default adapter id; unscripted providers fail
	pub fn new() -> Self {
		Self::with_id(MOCK_ADAPTER_ID)
	}

	pub fn with_id(adapter_id: &str) -> Self {
		Self {
			info: AdapterInfo::new(adapter_id, "Mock Provider Adapter", "1.0.0"),
			behaviors: HashMap::new(),
			default_behavior: MockBehavior::TransportFailure,
			delays_ms: HashMap::new(),
			total_calls: Arc::new(AtomicUsize::new(0)),
			calls_by_provider: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	pub fn on(mut self, provider_id: &str, behavior: MockBehavior) -> Self {
		self.behaviors.insert(provider_id.to_string(), behavior);
		self
	}

	/// Shorthand for a provider answering with items
	pub fn returning(self, provider_id: &str, items: Vec<LineItem>) -> Self {
		self.on(provider_id, MockBehavior::Items(items))
	}

	pub fn otherwise(mut self, behavior: MockBehavior) -> Self {
		self.default_behavior = behavior;
		self
	}

	pub fn with_delay(mut self, provider_id: &str, delay_ms: u64) -> Self {
		self.delays_ms.insert(provider_id.to_string(), delay_ms);
		self
	}

	pub fn call_count(&self) -> usize {
		self.total_calls.load(Ordering::SeqCst)
	}

	pub fn calls_for(&self, provider_id: &str) -> usize {
		self.calls_by_provider
			.lock()
			.map(|calls| calls.get(provider_id).copied().unwrap_or(0))
			.unwrap_or(0)
	}

	fn record_call(&self, provider_id: &str) {
		self.total_calls.fetch_add(1, Ordering::SeqCst);
		if let Ok(mut calls) = self.calls_by_provider.lock() {
			*calls.entry(provider_id.to_string()).or_insert(0) += 1;
		}
	}
}

impl Default for MockProviderAdapter {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
	fn adapter_info(&self) -> &AdapterInfo {
		&self.info
	}

	async fn analyze(
		&self,
		_input: &AnalysisInput,
		config: &ProviderRuntimeConfig,
	) -> ProviderResult<ProviderReport> {
		self.record_call(&config.provider_id);

		if let Some(delay_ms) = self.delays_ms.get(&config.provider_id) {
			tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
		}

		self.behaviors
			.get(&config.provider_id)
			.unwrap_or(&self.default_behavior)
			.respond(&config.provider_id)
	}
}

/// Provider config pointing at the mock adapter
pub fn mock_provider(provider_id: &str) -> ProviderConfig {
	ProviderConfig::new(
		provider_id,
		MOCK_ADAPTER_ID,
		"http://127.0.0.1:9/mock",
		"mock-vision",
	)
}

/// Provider settings entry for the mock adapter, with a plain credential
pub fn mock_provider_settings(provider_id: &str) -> ProviderSettings {
	let config = mock_provider(provider_id);
	ProviderSettings {
		provider_id: provider_id.to_string(),
		adapter_id: config.adapter_id,
		endpoint: config.endpoint,
		model: config.model,
		timeout_ms: None,
		enabled: true,
		credential: Some(ConfigurableValue::from_plain(&format!("{}-key", provider_id))),
		headers: None,
		name: None,
	}
}

/// Settings with the given fan-out providers and optional fallback, all mocked
pub fn mock_settings(provider_ids: &[&str], fallback_id: Option<&str>) -> Settings {
	let mut settings = Settings::default();
	for provider_id in provider_ids {
		settings
			.providers
			.insert(provider_id.to_string(), mock_provider_settings(provider_id));
	}
	settings.fallback = fallback_id.map(mock_provider_settings);
	settings
}

/// A small plate: rice and grilled chicken
pub fn sample_items() -> Vec<LineItem> {
	vec![
		LineItem::new("Rice", 150.0, "g", 200.0, 44.5, 0.4, 4.1),
		LineItem::new("Grilled chicken", 120.0, "g", 198.0, 0.0, 4.3, 37.2),
	]
}

/// One-pixel PNG, base64 encoded
pub fn sample_input() -> AnalysisInput {
	AnalysisInput::new(
		"iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=",
		"image/png",
	)
}
