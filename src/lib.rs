//! NutriScan
//!
//! Sends a meal photo to several inference providers at once, merges their
//! nutrition estimates into one normalized result, falls back to a single
//! centralized provider when the fan-out yields nothing, and optionally signs
//! the result.
//!
//! ```rust,no_run
//! use nutriscan::{AnalysisInput, CredentialSet, EngineBuilder};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = EngineBuilder::from_config()?.build()?;
//! engine.initialize(None).await?;
//!
//! let input = AnalysisInput::new("iVBORw0KGgo...", "image/png");
//! let credentials = CredentialSet::new().with("openai", "sk-...");
//! let result = engine.analyze(input, &credentials).await?;
//! println!("{} kcal ({} confidence)", result.totals.calories, result.confidence);
//!
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use nutriscan_service::{Aggregator, HmacSigner, IntegritySigner, ProviderInvoker};
use nutriscan_types::{ProviderConfig, ProviderRuntimeConfig};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

// Core domain types
pub use nutriscan_types::{
	chrono, serde_json, AnalysisInput, AnalysisResult, Confidence, CredentialSet, ExecutionMode,
	IntegrityProof, LineItem, MeasureTotals, MergeStrategy, ProviderError, ProviderReport,
	RequestContext, SecretString,
};

// Service layer
pub use nutriscan_service::{
	ControllerState, EngineError, IntegrityError, ResilienceController, SignerTrait,
};

// Adapters
pub use nutriscan_adapters::{
	AdapterRegistry, GeminiAdapter, OpenAiAdapter, ProviderAdapter, GEMINI_ADAPTER_ID,
	OPENAI_ADAPTER_ID,
};

// Config
pub use nutriscan_config::{
	load_config, load_config_from, log_engine_ready, log_service_info, log_service_shutdown,
	ConfigLoadError, LogFormat, Settings,
};

pub mod types {
	pub use nutriscan_types::*;
}

pub mod service {
	pub use nutriscan_service::*;
}

pub mod adapters {
	pub use nutriscan_adapters::*;
}

pub mod config {
	pub use nutriscan_config::*;
}

pub mod mocks;

pub use async_trait;
pub use tokio_util::sync::CancellationToken;

/// Builder for [`Engine`]
#[derive(Default)]
pub struct EngineBuilder {
	settings: Option<Settings>,
	adapter_registry: Option<AdapterRegistry>,
	signer: Option<Arc<dyn SignerTrait>>,
}

impl EngineBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder seeded from `config/nutriscan.toml` and the environment
	pub fn from_config() -> Result<Self, ConfigLoadError> {
		Ok(Self::new().with_settings(load_config()?))
	}

	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = Some(settings);
		self
	}

	pub fn settings(&self) -> Option<&Settings> {
		self.settings.as_ref()
	}

	/// Register an adapter on top of the built-in ones, replacing any with the same id
	pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
		let mut registry = self
			.adapter_registry
			.unwrap_or_else(AdapterRegistry::with_defaults);
		registry.insert(adapter);
		self.adapter_registry = Some(registry);
		self
	}

	/// Use exactly this registry
	pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
		self.adapter_registry = Some(registry);
		self
	}

	/// Sign with this signer instead of one built from the configured keys
	pub fn with_signer(mut self, signer: Arc<dyn SignerTrait>) -> Self {
		self.signer = Some(signer);
		self
	}

	/// Validate the configuration and create the engine
	///
	/// Every enabled provider, and the fallback, must reference a registered
	/// adapter.
	pub fn build(self) -> Result<Engine, EngineError> {
		let settings = self.settings.unwrap_or_default();
		settings
			.validate()
			.map_err(|e| EngineError::Configuration(e.to_string()))?;

		let registry = self
			.adapter_registry
			.unwrap_or_else(AdapterRegistry::with_defaults);

		for provider in settings
			.enabled_providers()
			.iter()
			.chain(settings.fallback_provider().iter())
		{
			if !registry.contains(&provider.adapter_id) {
				return Err(EngineError::Configuration(format!(
					"Provider '{}' references unknown adapter '{}'",
					provider.provider_id, provider.adapter_id
				)));
			}
		}

		Ok(Engine {
			settings,
			registry: Arc::new(registry),
			custom_signer: self.signer,
			state: RwLock::new(EngineState::Uninitialized),
			root_token: CancellationToken::new(),
		})
	}
}

enum EngineState {
	Uninitialized,
	Ready {
		controller: ResilienceController,
		signing_identity: Option<String>,
	},
	ShutDown,
}

/// The public face of the library
///
/// `initialize` must be called before `analyze`. After `shutdown` every
/// in-flight request is cancelled and later calls are rejected.
pub struct Engine {
	settings: Settings,
	registry: Arc<AdapterRegistry>,
	custom_signer: Option<Arc<dyn SignerTrait>>,
	state: RwLock<EngineState>,
	root_token: CancellationToken,
}

impl Engine {
	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub async fn is_initialized(&self) -> bool {
		matches!(*self.state.read().await, EngineState::Ready { .. })
	}

	/// Prepare the engine, optionally selecting a signing identity
	///
	/// Falls back to `security.default_signing_identity`. An identity whose
	/// key cannot be resolved leaves signing disabled and is only logged.
	pub async fn initialize(&self, signing_identity: Option<&str>) -> Result<(), EngineError> {
		let mut state = self.state.write().await;
		if matches!(*state, EngineState::ShutDown) {
			return Err(EngineError::ShutDown);
		}

		let identity = signing_identity
			.map(str::to_string)
			.or_else(|| self.settings.security.default_signing_identity.clone());
		let signer = self.resolve_signer(identity.as_deref());
		let active_identity = signer.signer_id();

		let controller = ResilienceController::new(
			ProviderInvoker::new(Arc::clone(&self.registry)),
			self.settings.timeouts.global_ms,
			Aggregator::new(self.settings.aggregation.merge_strategy),
			signer,
		);

		log_engine_ready(&self.settings, active_identity.as_deref());
		*state = EngineState::Ready {
			controller,
			signing_identity: active_identity,
		};
		Ok(())
	}

	fn resolve_signer(&self, identity: Option<&str>) -> IntegritySigner {
		if let Some(signer) = &self.custom_signer {
			return IntegritySigner::new(Arc::clone(signer));
		}

		let Some(identity) = identity else {
			return IntegritySigner::disabled();
		};

		match self.settings.signing_key(identity) {
			Ok(secret) => IntegritySigner::new(Arc::new(HmacSigner::new(identity, secret))),
			Err(e) => {
				warn!(
					"{}; results will be unsigned",
					IntegrityError::SigningUnavailable(e.to_string())
				);
				IntegritySigner::disabled()
			},
		}
	}

	/// Analyze one input with the configured providers
	pub async fn analyze(
		&self,
		input: AnalysisInput,
		credentials: &CredentialSet,
	) -> Result<AnalysisResult, EngineError> {
		self.analyze_with_cancel(input, credentials, CancellationToken::new())
			.await
	}

	/// Like [`analyze`](Self::analyze), aborting when `cancel` fires
	pub async fn analyze_with_cancel(
		&self,
		input: AnalysisInput,
		credentials: &CredentialSet,
		cancel: CancellationToken,
	) -> Result<AnalysisResult, EngineError> {
		let (controller, signing_identity) = match &*self.state.read().await {
			EngineState::Uninitialized => return Err(EngineError::NotInitialized),
			EngineState::ShutDown => return Err(EngineError::ShutDown),
			EngineState::Ready {
				controller,
				signing_identity,
			} => (controller.clone(), signing_identity.clone()),
		};

		let mut context = RequestContext::new(Uuid::new_v4().to_string(), input);
		for provider in self.settings.enabled_providers() {
			context = context.with_provider(self.bind_credential(&provider, credentials));
		}
		if let Some(fallback) = self.settings.fallback_provider() {
			context = context.with_fallback(self.bind_credential(&fallback, credentials));
		}
		if let Some(identity) = signing_identity {
			context = context.with_signing_identity(identity);
		}

		let request_token = self.root_token.child_token();
		tokio::select! {
			result = controller.run(context, request_token.clone()) => result,
			_ = cancel.cancelled() => {
				request_token.cancel();
				info!("Analysis cancelled by caller");
				Err(EngineError::Cancelled)
			},
		}
	}

	/// Request credentials win over configured ones; a missing credential is
	/// left empty so the invoker reports it for that provider alone.
	fn bind_credential(
		&self,
		provider: &ProviderConfig,
		credentials: &CredentialSet,
	) -> ProviderRuntimeConfig {
		let credential = match credentials.get(&provider.provider_id) {
			Some(credential) => credential.clone(),
			None => match self.settings.configured_credential(&provider.provider_id) {
				Ok(Some(credential)) => credential,
				Ok(None) => {
					debug!("No credential for provider {}", provider.provider_id);
					SecretString::default()
				},
				Err(e) => {
					warn!(
						"Configured credential for provider {} unavailable: {}",
						provider.provider_id, e
					);
					SecretString::default()
				},
			},
		};
		ProviderRuntimeConfig::new(provider, credential)
	}

	/// Check a result's integrity proof with the active signer
	pub async fn verify(&self, result: &AnalysisResult) -> Result<bool, EngineError> {
		match &*self.state.read().await {
			EngineState::Uninitialized => Err(EngineError::NotInitialized),
			EngineState::ShutDown => Err(EngineError::ShutDown),
			EngineState::Ready { controller, .. } => controller
				.signer()
				.verify(result)
				.map_err(|e| EngineError::Configuration(e.to_string())),
		}
	}

	/// Cancel in-flight requests and reject further calls
	pub async fn shutdown(&self) {
		self.root_token.cancel();
		*self.state.write().await = EngineState::ShutDown;
		log_service_shutdown();
	}
}

/// Install the global tracing subscriber described by `settings.logging`
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(settings: &Settings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level));
	let structured = settings.logging.structured;

	match settings.logging.format {
		LogFormat::Json => tracing_subscriber::fmt()
			.json()
			.with_env_filter(env_filter)
			.with_target(structured)
			.with_thread_ids(structured)
			.try_init(),
		LogFormat::Pretty => tracing_subscriber::fmt()
			.pretty()
			.with_env_filter(env_filter)
			.with_target(structured)
			.with_thread_ids(structured)
			.try_init(),
		LogFormat::Compact => tracing_subscriber::fmt()
			.compact()
			.with_env_filter(env_filter)
			.with_target(structured)
			.with_thread_ids(structured)
			.try_init(),
	}
}
