//! NutriScan service
//!
//! Request orchestration: single provider calls, concurrent fan-out, merging,
//! signing and the fallback state machine tying them together.

pub mod aggregator;
pub mod fan_out;
pub mod integrity;
pub mod invoker;
pub mod resilience;

#[cfg(test)]
pub(crate) mod test_utils;

pub use aggregator::{AggregationError, Aggregator, MergedAnalysis};
pub use fan_out::{FanOutCoordinator, FanOutError, FanOutReport, DEFAULT_GLOBAL_TIMEOUT_MS};
pub use integrity::{
	digest_payload, HmacSigner, IntegrityError, IntegritySigner, SignerTrait, SIGNATURE_ALGORITHM,
};
pub use invoker::{ProviderInvoker, ProviderOutcome, SourceReport};
pub use nutriscan_types::IntegrityPayload;
pub use resilience::{ControllerState, EngineError, ResilienceController};
