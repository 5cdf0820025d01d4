//! Request plumbing shared by the HTTP adapters

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use nutriscan_types::{ProviderError, ProviderResult, ProviderRuntimeConfig};

use crate::client_cache::AuthConfig;

/// Join `path` onto `base_url`, treating the base as a directory
pub fn build_url(provider_id: &str, base_url: &str, path: &str) -> ProviderResult<String> {
	let mut base = Url::parse(base_url).map_err(|e| ProviderError::InvalidInput {
		provider_id: provider_id.to_string(),
		reason: format!("invalid endpoint '{}': {}", base_url, e),
	})?;

	if !base.path().ends_with('/') {
		base.set_path(&format!("{}/", base.path()));
	}

	let joined = base.join(path).map_err(|e| ProviderError::InvalidInput {
		provider_id: provider_id.to_string(),
		reason: format!("failed to join '{}' onto '{}': {}", path, base_url, e),
	})?;

	Ok(joined.to_string())
}

/// POST a JSON body and return the raw response text
///
/// Connection failures, timeouts and non-2xx statuses are mapped to transport
/// errors. The body is returned as text so each adapter can unwrap its own
/// envelope. `auth` is attached to this request only.
pub async fn post_json<B: Serialize + ?Sized>(
	client: &Client,
	url: &str,
	body: &B,
	config: &ProviderRuntimeConfig,
	auth: &AuthConfig,
) -> ProviderResult<String> {
	debug!("Sending analysis request to provider {} at {}", config.provider_id, url);

	let request = client
		.post(url)
		.timeout(Duration::from_millis(config.timeout_ms))
		.json(body);
	let response = auth
		.apply(&config.provider_id, request)?
		.send()
		.await
		.map_err(|e| map_reqwest_error(&config.provider_id, config.timeout_ms, e))?;

	let status = response.status();
	if !status.is_success() {
		let detail = response.text().await.unwrap_or_default();
		debug!(
			"Provider {} responded with status {}: {}",
			config.provider_id, status, detail
		);
		return Err(ProviderError::from_http_status(
			config.provider_id.clone(),
			status.as_u16(),
		));
	}

	response
		.text()
		.await
		.map_err(|e| map_reqwest_error(&config.provider_id, config.timeout_ms, e))
}

fn map_reqwest_error(provider_id: &str, timeout_ms: u64, error: reqwest::Error) -> ProviderError {
	if error.is_timeout() {
		ProviderError::Timeout {
			provider_id: provider_id.to_string(),
			timeout_ms,
		}
	} else {
		ProviderError::Transport {
			provider_id: provider_id.to_string(),
			reason: error.to_string(),
		}
	}
}
