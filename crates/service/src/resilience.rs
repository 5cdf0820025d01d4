//! Fallback orchestration
//!
//! The controller drives one request through an explicit state machine:
//!
//! ```text
//! AttemptFull --(>= 1 success)--> Aggregate --(ok)--> Success
//!      |                              |
//!      +--(no success)--+   +--(empty)+
//!                       v   v
//!                  AttemptFallback --(ok)--> Success
//!                       |
//!                       +--(failed / none)--> Failure
//! ```
//!
//! `AttemptFallback` and `Failure` carry the reason the request got there, which
//! becomes the cause of [`EngineError::ProvidersExhausted`]. Cancellation at any
//! point ends the request with [`EngineError::Cancelled`].

use std::sync::Arc;

use chrono::Utc;
use nutriscan_types::{AnalysisResult, Confidence, ExecutionMode, ProviderReport, RequestContext};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregator::{Aggregator, MergedAnalysis};
use crate::fan_out::{FanOutCoordinator, FanOutError, FanOutReport};
use crate::integrity::IntegritySigner;
use crate::invoker::ProviderInvoker;

/// Errors crossing the engine's public boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
	#[error("All providers exhausted after {providers_attempted} attempts: {cause}")]
	ProvidersExhausted {
		cause: String,
		providers_attempted: usize,
	},

	#[error("No providers configured")]
	NoProviders,

	#[error("Analysis cancelled")]
	Cancelled,

	#[error("Engine not initialized")]
	NotInitialized,

	#[error("Engine has been shut down")]
	ShutDown,

	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl EngineError {
	/// Number of providers attempted before the failure, where known
	pub fn providers_attempted(&self) -> usize {
		match self {
			EngineError::ProvidersExhausted {
				providers_attempted,
				..
			} => *providers_attempted,
			_ => 0,
		}
	}
}

impl From<FanOutError> for EngineError {
	fn from(error: FanOutError) -> Self {
		match error {
			FanOutError::Cancelled => EngineError::Cancelled,
		}
	}
}

/// Controller states; `Success` and `Failure` are terminal
#[derive(Debug)]
pub enum ControllerState {
	AttemptFull,
	Aggregate(FanOutReport),
	/// Why the full attempt produced nothing usable
	AttemptFallback(String),
	Success(Box<AnalysisResult>),
	/// Why the request failed
	Failure(String),
}

impl ControllerState {
	pub fn name(&self) -> &'static str {
		match self {
			ControllerState::AttemptFull => "attempt-full",
			ControllerState::Aggregate(_) => "aggregate",
			ControllerState::AttemptFallback(_) => "attempt-fallback",
			ControllerState::Success(_) => "success",
			ControllerState::Failure(_) => "failure",
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, ControllerState::Success(_) | ControllerState::Failure(_))
	}
}

#[derive(Debug, Clone)]
pub struct ResilienceController {
	invoker: ProviderInvoker,
	coordinator: FanOutCoordinator,
	aggregator: Aggregator,
	signer: IntegritySigner,
}

impl ResilienceController {
	pub fn new(
		invoker: ProviderInvoker,
		global_timeout_ms: u64,
		aggregator: Aggregator,
		signer: IntegritySigner,
	) -> Self {
		Self {
			coordinator: FanOutCoordinator::new(invoker.clone(), global_timeout_ms),
			invoker,
			aggregator,
			signer,
		}
	}

	pub fn signer(&self) -> &IntegritySigner {
		&self.signer
	}

	/// Run one request to completion
	pub async fn run(
		&self,
		context: RequestContext,
		cancel: CancellationToken,
	) -> Result<AnalysisResult, EngineError> {
		if context.providers.is_empty() && context.fallback.is_none() {
			return Err(EngineError::NoProviders);
		}

		info!(
			"Starting analysis {} with {} providers (fallback: {}, signing identity: {})",
			context.request_id,
			context.providers.len(),
			context
				.fallback
				.as_ref()
				.map(|f| f.provider_id.as_str())
				.unwrap_or("none"),
			context.signing_identity.as_deref().unwrap_or("none")
		);

		let input = Arc::new(context.input.clone());
		let mut attempted = 0usize;
		let mut state = ControllerState::AttemptFull;

		loop {
			if !state.is_terminal() && cancel.is_cancelled() {
				warn!("Analysis {} cancelled in state {}", context.request_id, state.name());
				return Err(EngineError::Cancelled);
			}
			debug!("Analysis {} entering state {}", context.request_id, state.name());

			state = match state {
				ControllerState::AttemptFull => {
					if context.providers.is_empty() {
						ControllerState::AttemptFallback("no providers configured".to_string())
					} else {
						let report = self
							.coordinator
							.run(Arc::clone(&input), &context.providers, &cancel)
							.await?;
						attempted += report.attempted;

						if report.has_successes() {
							ControllerState::Aggregate(report)
						} else {
							let cause = report.failure_summary();
							warn!(
								"No provider succeeded for analysis {}: {}",
								context.request_id, cause
							);
							ControllerState::AttemptFallback(cause)
						}
					}
				},
				ControllerState::Aggregate(report) => {
					match self.aggregator.aggregate(&report.successes) {
						Ok(merged) => {
							let mut result = Self::multi_provider_result(merged, attempted);
							self.signer.attach(&mut result);
							ControllerState::Success(Box::new(result))
						},
						Err(e) => {
							warn!("Aggregation failed for analysis {}: {}", context.request_id, e);
							ControllerState::AttemptFallback(e.to_string())
						},
					}
				},
				ControllerState::AttemptFallback(cause) => match &context.fallback {
					None => {
						info!("No fallback provider configured for analysis {}", context.request_id);
						ControllerState::Failure(cause)
					},
					Some(fallback) => {
						attempted += 1;
						info!(
							"Falling back to provider {} for analysis {} after: {}",
							fallback.provider_id, context.request_id, cause
						);

						let outcome = tokio::select! {
							_ = cancel.cancelled() => return Err(EngineError::Cancelled),
							outcome = self.invoker.invoke(&input, fallback) => outcome,
						};

						match outcome.result {
							Ok(report) => ControllerState::Success(Box::new(Self::fallback_result(
								report,
								&fallback.provider_id,
								attempted,
							))),
							Err(e) => ControllerState::Failure(format!(
								"fallback {} failed: {} (after: {})",
								fallback.provider_id, e, cause
							)),
						}
					},
				},
				ControllerState::Success(result) => {
					info!(
						"Analysis {} succeeded in {} mode with {} of {} providers ({} confidence)",
						context.request_id,
						result.mode,
						result.providers_used,
						result.providers_attempted,
						result.confidence
					);
					return Ok(*result);
				},
				ControllerState::Failure(cause) => {
					warn!(
						"Analysis {} failed after {} attempts: {}",
						context.request_id, attempted, cause
					);
					return Err(EngineError::ProvidersExhausted {
						cause,
						providers_attempted: attempted,
					});
				},
			};
		}
	}

	fn multi_provider_result(merged: MergedAnalysis, attempted: usize) -> AnalysisResult {
		AnalysisResult {
			analysis_id: Uuid::new_v4().to_string(),
			items: merged.items,
			totals: merged.totals,
			providers_used: merged.providers_used,
			providers_attempted: attempted,
			contributing_providers: merged.contributing_providers,
			confidence: merged.confidence,
			timestamp: Utc::now(),
			mode: ExecutionMode::MultiProvider,
			integrity: None,
		}
	}

	fn fallback_result(report: ProviderReport, provider_id: &str, attempted: usize) -> AnalysisResult {
		AnalysisResult {
			analysis_id: Uuid::new_v4().to_string(),
			items: report.items,
			totals: report.totals,
			providers_used: 1,
			providers_attempted: attempted,
			contributing_providers: vec![provider_id.to_string()],
			confidence: Confidence::Low,
			timestamp: Utc::now(),
			mode: ExecutionMode::SingleProviderFallback,
			integrity: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::integrity::HmacSigner;
	use crate::test_utils::*;
	use nutriscan_adapters::AdapterRegistry;
	use nutriscan_types::SecretString;

	fn controller(adapter: ScriptedAdapter, signer: IntegritySigner) -> ResilienceController {
		let mut registry = AdapterRegistry::new();
		registry.insert(Arc::new(adapter));
		ResilienceController::new(
			ProviderInvoker::new(Arc::new(registry)),
			2_000,
			Aggregator::default(),
			signer,
		)
	}

	fn context(providers: &[&str], fallback: Option<&str>) -> RequestContext {
		let mut context = RequestContext::new("req-1", sample_input());
		for provider in providers {
			context = context.with_provider(runtime(provider));
		}
		if let Some(fallback) = fallback {
			context = context.with_fallback(runtime(fallback));
		}
		context
	}

	#[tokio::test]
	async fn test_partial_failure_yields_multi_provider_result() {
		let adapter = ScriptedAdapter::new()
			.fail("a", transport_error("a"))
			.fail("b", parse_error("b"))
			.succeed("c", &[("Rice", 150.0, 200.0)]);
		let calls = adapter.calls();

		let result = controller(adapter, IntegritySigner::disabled())
			.run(context(&["a", "b", "c"], Some("central")), CancellationToken::new())
			.await
			.unwrap();

		assert_eq!(result.mode, ExecutionMode::MultiProvider);
		assert_eq!(result.providers_used, 1);
		assert_eq!(result.providers_attempted, 3);
		assert_eq!(result.confidence, Confidence::Medium);
		assert_eq!(calls.count("central"), 0);
	}

	#[tokio::test]
	async fn test_total_failure_uses_fallback_once() {
		let adapter = ScriptedAdapter::new()
			.fail("a", transport_error("a"))
			.fail("b", parse_error("b"))
			.succeed("central", &[("Rice", 150.0, 200.0)]);
		let calls = adapter.calls();

		let result = controller(adapter, IntegritySigner::disabled())
			.run(context(&["a", "b"], Some("central")), CancellationToken::new())
			.await
			.unwrap();

		assert_eq!(result.mode, ExecutionMode::SingleProviderFallback);
		assert_eq!(result.confidence, Confidence::Low);
		assert_eq!(result.providers_used, 1);
		assert_eq!(result.providers_attempted, 3);
		assert_eq!(result.contributing_providers, vec!["central".to_string()]);
		assert_eq!(calls.count("central"), 1);
	}

	#[tokio::test]
	async fn test_exhaustion_reports_cause_and_stops() {
		let adapter = ScriptedAdapter::new()
			.fail("a", transport_error("a"))
			.fail("central", parse_error("central"));
		let calls = adapter.calls();

		let err = controller(adapter, IntegritySigner::disabled())
			.run(context(&["a"], Some("central")), CancellationToken::new())
			.await
			.unwrap_err();

		match &err {
			EngineError::ProvidersExhausted {
				cause,
				providers_attempted,
			} => {
				assert!(cause.starts_with("fallback central failed"));
				assert!(cause.contains("central"));
				assert!(cause.contains("connection refused"));
				assert_eq!(*providers_attempted, 2);
			},
			other => panic!("unexpected error: {:?}", other),
		}
		assert_eq!(calls.total(), 2);
	}

	#[tokio::test]
	async fn test_no_fallback_configured_is_failure() {
		let adapter = ScriptedAdapter::new().fail("a", transport_error("a"));
		let err = controller(adapter, IntegritySigner::disabled())
			.run(context(&["a"], None), CancellationToken::new())
			.await
			.unwrap_err();
		assert_eq!(err.providers_attempted(), 1);
		assert!(err.to_string().contains("connection refused"));
	}

	#[test]
	fn test_failure_state_carries_its_cause() {
		let state = ControllerState::Failure("fallback central failed".to_string());
		assert!(state.is_terminal());
		assert_eq!(state.name(), "failure");
		match state {
			ControllerState::Failure(cause) => assert_eq!(cause, "fallback central failed"),
			other => panic!("unexpected state {}", other.name()),
		}

		let pending = ControllerState::AttemptFallback("a: timed out".to_string());
		assert!(!pending.is_terminal());
		assert_eq!(pending.name(), "attempt-fallback");
	}

	#[tokio::test]
	async fn test_no_providers_at_all() {
		let err = controller(ScriptedAdapter::new(), IntegritySigner::disabled())
			.run(context(&[], None), CancellationToken::new())
			.await
			.unwrap_err();
		assert_eq!(err, EngineError::NoProviders);
	}

	#[tokio::test]
	async fn test_fallback_only_context() {
		let adapter = ScriptedAdapter::new().succeed("central", &[("Egg", 1.0, 78.0)]);
		let result = controller(adapter, IntegritySigner::disabled())
			.run(context(&[], Some("central")), CancellationToken::new())
			.await
			.unwrap();
		assert_eq!(result.mode, ExecutionMode::SingleProviderFallback);
		assert_eq!(result.providers_attempted, 1);
	}

	#[tokio::test]
	async fn test_multi_provider_result_is_signed_fallback_is_not() {
		let signer = IntegritySigner::new(Arc::new(HmacSigner::new(
			"ops",
			SecretString::from("secret"),
		)));

		let adapter = ScriptedAdapter::new()
			.succeed("a", &[("Rice", 150.0, 200.0)])
			.succeed("b", &[("rice", 170.0, 220.0)]);
		let signed = controller(adapter, signer.clone())
			.run(context(&["a", "b"], None), CancellationToken::new())
			.await
			.unwrap();
		assert!(signed.is_signed());
		assert!(signer.verify(&signed).unwrap());
		assert_eq!(signed.items[0].quantity, 160.0);
		assert_eq!(signed.confidence, Confidence::High);

		let adapter = ScriptedAdapter::new()
			.fail("a", transport_error("a"))
			.succeed("central", &[("Rice", 150.0, 200.0)]);
		let fallback = controller(adapter, signer)
			.run(context(&["a"], Some("central")), CancellationToken::new())
			.await
			.unwrap();
		assert!(!fallback.is_signed());
	}

	#[tokio::test]
	async fn test_cancelled_before_start() {
		let adapter = ScriptedAdapter::new().succeed("a", &[("Rice", 150.0, 200.0)]);
		let calls = adapter.calls();
		let cancel = CancellationToken::new();
		cancel.cancel();

		let err = controller(adapter, IntegritySigner::disabled())
			.run(context(&["a"], Some("central")), cancel)
			.await
			.unwrap_err();
		assert_eq!(err, EngineError::Cancelled);
		assert_eq!(calls.total(), 0);
	}

	#[tokio::test]
	async fn test_cancelled_during_fallback() {
		let adapter = ScriptedAdapter::new()
			.fail("a", transport_error("a"))
			.succeed("central", &[("Rice", 150.0, 200.0)])
			.with_delay("central", 5_000);
		let cancel = CancellationToken::new();
		let trigger = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(std::time::Duration::from_millis(100)).await;
			trigger.cancel();
		});

		let err = controller(adapter, IntegritySigner::disabled())
			.run(context(&["a"], Some("central")), cancel)
			.await
			.unwrap_err();
		assert_eq!(err, EngineError::Cancelled);
	}
}
