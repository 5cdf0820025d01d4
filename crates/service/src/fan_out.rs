//! Concurrent dispatch to every provider
//!
//! Each provider call runs in its own task. Outcomes are collected as they
//! arrive and one failure never short-circuits the rest. The whole fan-out is
//! bounded by a global deadline and can be cancelled as a group.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use nutriscan_types::{AnalysisInput, ProviderError, ProviderRuntimeConfig};
use thiserror::Error;
use tokio::task::AbortHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::invoker::{ProviderInvoker, SourceReport};

/// Default bound on the entire fan-out
pub const DEFAULT_GLOBAL_TIMEOUT_MS: u64 = 45_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FanOutError {
	#[error("Fan-out cancelled")]
	Cancelled,
}

/// Everything the fan-out learned, successes in arrival order
#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
	pub successes: Vec<SourceReport>,
	pub failures: Vec<ProviderError>,
	pub attempted: usize,
}

impl FanOutReport {
	pub fn has_successes(&self) -> bool {
		!self.successes.is_empty()
	}

	/// One line describing the failures, for error reporting
	pub fn failure_summary(&self) -> String {
		self.failures
			.iter()
			.map(|e| e.to_string())
			.collect::<Vec<_>>()
			.join("; ")
	}
}

/// Aborts every spawned call when the fan-out ends, however it ends
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
	fn drop(&mut self) {
		for handle in &self.0 {
			handle.abort();
		}
	}
}

#[derive(Debug, Clone)]
pub struct FanOutCoordinator {
	invoker: ProviderInvoker,
	global_timeout_ms: u64,
}

impl FanOutCoordinator {
	pub fn new(invoker: ProviderInvoker, global_timeout_ms: u64) -> Self {
		Self {
			invoker,
			global_timeout_ms,
		}
	}

	pub fn global_timeout_ms(&self) -> u64 {
		self.global_timeout_ms
	}

	/// Call every provider concurrently and wait for all of them to settle
	///
	/// Returns `Cancelled` without any partial result if `cancel` fires first.
	/// Calls still running at the global deadline are aborted and reported as
	/// timeouts.
	pub async fn run(
		&self,
		input: Arc<AnalysisInput>,
		providers: &[ProviderRuntimeConfig],
		cancel: &CancellationToken,
	) -> Result<FanOutReport, FanOutError> {
		info!(
			"Fanning out to {} providers (global timeout {}ms)",
			providers.len(),
			self.global_timeout_ms
		);

		if cancel.is_cancelled() {
			return Err(FanOutError::Cancelled);
		}

		let mut tasks = FuturesUnordered::new();
		let mut abort_handles = Vec::with_capacity(providers.len());

		for (index, provider) in providers.iter().enumerate() {
			let invoker = self.invoker.clone();
			let input = Arc::clone(&input);
			let provider = provider.clone();

			let handle = tokio::spawn(async move { invoker.invoke(&input, &provider).await });
			abort_handles.push(handle.abort_handle());
			tasks.push(async move { (index, handle.await) });
		}
		let _guard = AbortOnDrop(abort_handles);

		let mut report = FanOutReport {
			attempted: providers.len(),
			..Default::default()
		};
		let mut settled = vec![false; providers.len()];

		let deadline = sleep(Duration::from_millis(self.global_timeout_ms));
		tokio::pin!(deadline);

		loop {
			tokio::select! {
				biased;

				_ = cancel.cancelled() => {
					warn!("Fan-out cancelled with {} calls in flight", settled.iter().filter(|s| !**s).count());
					return Err(FanOutError::Cancelled);
				},
				_ = &mut deadline => {
					warn!("Global fan-out timeout reached after {}ms", self.global_timeout_ms);
					for (index, provider) in providers.iter().enumerate() {
						if !settled[index] {
							report.failures.push(ProviderError::Timeout {
								provider_id: provider.provider_id.clone(),
								timeout_ms: self.global_timeout_ms,
							});
						}
					}
					break;
				},
				next = tasks.next() => match next {
					Some((index, joined)) => {
						settled[index] = true;
						match joined {
							Ok(outcome) => match outcome.into_result() {
								Ok(source) => report.successes.push(source),
								Err(e) => report.failures.push(e),
							},
							Err(e) => {
								let provider_id = &providers[index].provider_id;
								warn!("Task for provider {} did not complete: {}", provider_id, e);
								report.failures.push(ProviderError::Transport {
									provider_id: provider_id.clone(),
									reason: format!("provider task failed: {}", e),
								});
							},
						}
					},
					None => break,
				},
			}
		}

		info!(
			"Fan-out settled: {} succeeded, {} failed of {} attempted",
			report.successes.len(),
			report.failures.len(),
			report.attempted
		);
		debug!(
			"Arrival order: {:?}",
			report
				.successes
				.iter()
				.map(|s| s.provider_id.as_str())
				.collect::<Vec<_>>()
		);

		Ok(report)
	}
}
