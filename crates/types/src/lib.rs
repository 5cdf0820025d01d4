//! NutriScan Types
//!
//! Shared models and traits for the multi-provider analysis engine: line items,
//! provider reports, final results, provider configuration and the adapter trait.

pub mod analysis;
pub mod integrity;
pub mod models;
pub mod providers;
pub mod request;

// Re-export chrono and serde_json for convenience
pub use chrono;
pub use serde_json;

pub use analysis::{
	normalize_item_name, round_tenth, round_whole, AnalysisResult, Confidence, ExecutionMode,
	IntegrityProof, LineItem, MeasureTotals, MergeStrategy, ProviderReport,
};
pub use integrity::IntegrityPayload;
pub use models::{constant_time_eq, SecretString};
pub use providers::{
	AdapterInfo, ProviderAdapter, ProviderConfig, ProviderError, ProviderErrorKind,
	ProviderResult, ProviderRuntimeConfig, DEFAULT_PROVIDER_TIMEOUT_MS,
};
pub use request::{AnalysisInput, CredentialSet, RequestContext};
