//! Shared HTTP client pool
//!
//! One `reqwest::Client` per (provider, endpoint, header set), reused across
//! requests and expired after a TTL. Credentials are not part of the key: they
//! vary per request and are attached to each request with [`AuthConfig`], so
//! the pool is bounded by the configured providers. This is the only
//! process-wide state the engine touches; `DashMap` makes it safe to hit from
//! every fan-out task at once.

use dashmap::{mapref::entry::Entry, DashMap};
use nutriscan_types::{ProviderError, ProviderResult, ProviderRuntimeConfig, SecretString};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, RequestBuilder};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("NutriScan/", env!("CARGO_PKG_VERSION"));

/// Cache key and build parameters for one pooled client
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientConfig {
	pub base_url: String,
	pub provider_id: String,
	pub max_idle_per_host: usize,
	pub keep_alive_timeout_ms: u64,
	pub connect_timeout_ms: u64,
	/// Default headers from configuration; never credentials
	pub headers: Vec<(String, String)>,
}

impl fmt::Debug for ClientConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// configured headers may carry tenant keys, so only names are shown
		let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
		f.debug_struct("ClientConfig")
			.field("base_url", &self.base_url)
			.field("provider_id", &self.provider_id)
			.field("max_idle_per_host", &self.max_idle_per_host)
			.field("keep_alive_timeout_ms", &self.keep_alive_timeout_ms)
			.field("connect_timeout_ms", &self.connect_timeout_ms)
			.field("headers", &header_names)
			.finish()
	}
}

impl From<&ProviderRuntimeConfig> for ClientConfig {
	fn from(provider: &ProviderRuntimeConfig) -> Self {
		let mut headers = vec![
			("User-Agent".to_string(), USER_AGENT.to_string()),
			("Content-Type".to_string(), "application/json".to_string()),
		];

		if let Some(extra) = &provider.headers {
			let mut extra: Vec<_> = extra.iter().collect();
			extra.sort();
			for (key, value) in extra {
				headers.push((key.clone(), value.clone()));
			}
		}

		Self {
			base_url: provider.endpoint.clone(),
			provider_id: provider.provider_id.clone(),
			max_idle_per_host: 8,
			keep_alive_timeout_ms: 90_000,
			connect_timeout_ms: 10_000,
			headers,
		}
	}
}

/// How a provider expects its credential
#[derive(Debug, Clone)]
pub enum AuthConfig {
	None,
	/// `Authorization: Bearer <token>`
	Bearer { token: SecretString },
	/// Credential in a named header
	ApiKey { header: String, key: SecretString },
}

impl AuthConfig {
	pub fn bearer(token: &SecretString) -> Self {
		Self::Bearer {
			token: token.clone(),
		}
	}

	pub fn api_key(header: &str, key: &SecretString) -> Self {
		Self::ApiKey {
			header: header.to_string(),
			key: key.clone(),
		}
	}

	/// Attach the credential to one outgoing request, marked sensitive
	pub fn apply(&self, provider_id: &str, request: RequestBuilder) -> ProviderResult<RequestBuilder> {
		match self {
			AuthConfig::None => Ok(request),
			AuthConfig::Bearer { token } => Ok(request.bearer_auth(token.expose_secret())),
			AuthConfig::ApiKey { header, key } => {
				let invalid = |reason: String| ProviderError::InvalidInput {
					provider_id: provider_id.to_string(),
					reason,
				};
				let name = HeaderName::from_bytes(header.as_bytes())
					.map_err(|e| invalid(format!("invalid credential header '{}': {}", header, e)))?;
				let mut value = HeaderValue::from_str(key.expose_secret())
					.map_err(|_| invalid("credential is not a valid header value".to_string()))?;
				value.set_sensitive(true);
				Ok(request.header(name, value))
			},
		}
	}
}

#[derive(Debug, Clone)]
struct CachedClient {
	client: Arc<Client>,
	created_at: Instant,
}

impl CachedClient {
	fn new(client: Client) -> Self {
		Self {
			client: Arc::new(client),
			created_at: Instant::now(),
		}
	}

	fn is_expired(&self, ttl: Duration) -> bool {
		self.created_at.elapsed() > ttl
	}
}

/// Thread-safe client cache with TTL; clones share the same pool
#[derive(Clone, Debug)]
pub struct ClientCache {
	clients: Arc<DashMap<ClientConfig, CachedClient>>,
	ttl: Duration,
}

impl ClientCache {
	/// New cache with a 30 minute TTL
	pub fn new() -> Self {
		Self::with_ttl(Duration::from_secs(30 * 60))
	}

	pub fn with_ttl(ttl: Duration) -> Self {
		Self {
			clients: Arc::new(DashMap::new()),
			ttl,
		}
	}

	/// Handle to the process-wide cache
	pub fn for_adapter() -> Self {
		GLOBAL_CLIENT_CACHE.clone()
	}

	/// Get or create a client for the given configuration
	///
	/// Expired clients, for any provider, are dropped on the way.
	pub fn get_client(&self, config: &ClientConfig) -> ProviderResult<Arc<Client>> {
		self.cleanup_expired();

		if let Some(cached) = self.clients.get(config) {
			debug!("Reusing pooled client for provider {}", config.provider_id);
			return Ok(cached.client.clone());
		}

		let cached = CachedClient::new(Self::build_client(config)?);

		match self.clients.entry(config.clone()) {
			Entry::Occupied(entry) => {
				// lost the race to another task; keep the first client
				Ok(entry.get().client.clone())
			},
			Entry::Vacant(entry) => {
				debug!("Pooled new client for provider {}", config.provider_id);
				let client = cached.client.clone();
				entry.insert(cached);
				Ok(client)
			},
		}
	}

	/// Client for a provider; the credential is left to [`AuthConfig::apply`]
	pub fn get_client_for(&self, provider: &ProviderRuntimeConfig) -> ProviderResult<Arc<Client>> {
		self.get_client(&ClientConfig::from(provider))
	}

	fn build_client(config: &ClientConfig) -> ProviderResult<Client> {
		let mut header_map = reqwest::header::HeaderMap::new();
		for (key, value) in &config.headers {
			match (
				HeaderName::from_bytes(key.as_bytes()),
				HeaderValue::from_str(value),
			) {
				(Ok(name), Ok(mut value)) => {
					if !matches!(key.to_ascii_lowercase().as_str(), "user-agent" | "content-type") {
						value.set_sensitive(true);
					}
					header_map.insert(name, value);
				},
				_ => warn!(
					"Skipping invalid header '{}' for provider {}",
					key, config.provider_id
				),
			}
		}

		ClientBuilder::new()
			.default_headers(header_map)
			.pool_max_idle_per_host(config.max_idle_per_host)
			.pool_idle_timeout(Duration::from_millis(config.keep_alive_timeout_ms))
			.connect_timeout(Duration::from_millis(config.connect_timeout_ms))
			.tcp_keepalive(Duration::from_secs(60))
			.build()
			.map_err(|e| ProviderError::Transport {
				provider_id: config.provider_id.clone(),
				reason: format!("failed to build HTTP client: {}", e),
			})
	}

	/// Drop expired clients, returning how many were removed
	pub fn cleanup_expired(&self) -> usize {
		let mut removed = 0;
		self.clients.retain(|_, cached| {
			let expired = cached.is_expired(self.ttl);
			if expired {
				removed += 1;
			}
			!expired
		});
		if removed > 0 {
			warn!("Removed {} expired clients from the pool", removed);
		}
		removed
	}

	pub fn clear(&self) {
		self.clients.clear();
	}

	pub fn len(&self) -> usize {
		self.clients.len()
	}

	pub fn is_empty(&self) -> bool {
		self.clients.is_empty()
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}
}

impl Default for ClientCache {
	fn default() -> Self {
		Self::new()
	}
}

lazy_static::lazy_static! {
	static ref GLOBAL_CLIENT_CACHE: ClientCache = ClientCache::new();
}
