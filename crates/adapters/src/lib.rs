//! NutriScan provider adapters
//!
//! Wire-protocol implementations for the inference providers the engine can
//! fan out to, and the registry the engine looks them up in.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

pub mod client_cache;
pub mod gemini_adapter;
pub mod http;
pub mod openai_adapter;
pub mod prompt;
pub mod response_parser;

pub use client_cache::{AuthConfig, ClientCache, ClientConfig};
pub use gemini_adapter::{GeminiAdapter, GEMINI_ADAPTER_ID};
pub use nutriscan_types::{AdapterInfo, ProviderAdapter, ProviderError, ProviderResult};
pub use openai_adapter::{OpenAiAdapter, OPENAI_ADAPTER_ID};
pub use prompt::DEFAULT_INSTRUCTION;
pub use response_parser::{extract_json_object, parse_report};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
	#[error("Adapter '{0}' is already registered")]
	Duplicate(String),
}

/// Adapters keyed by adapter id
#[derive(Debug, Default, Clone)]
pub struct AdapterRegistry {
	adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
	/// Empty registry
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry with the built-in OpenAI and Gemini adapters
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry.insert(Arc::new(OpenAiAdapter::new()));
		registry.insert(Arc::new(GeminiAdapter::new()));
		registry
	}

	/// Register an adapter, refusing to shadow an existing id
	pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) -> Result<(), RegistryError> {
		let id = adapter.id().to_string();
		if self.adapters.contains_key(&id) {
			return Err(RegistryError::Duplicate(id));
		}
		self.insert(adapter);
		Ok(())
	}

	/// Register an adapter, replacing any adapter with the same id
	pub fn insert(&mut self, adapter: Arc<dyn ProviderAdapter>) {
		debug!("Registering adapter {} ({})", adapter.id(), adapter.name());
		self.adapters.insert(adapter.id().to_string(), adapter);
	}

	pub fn get(&self, adapter_id: &str) -> Option<Arc<dyn ProviderAdapter>> {
		self.adapters.get(adapter_id).cloned()
	}

	pub fn contains(&self, adapter_id: &str) -> bool {
		self.adapters.contains_key(adapter_id)
	}

	/// Registered adapter ids, sorted
	pub fn adapter_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.adapters.keys().cloned().collect();
		ids.sort();
		ids
	}

	pub fn len(&self) -> usize {
		self.adapters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.adapters.is_empty()
	}
}
