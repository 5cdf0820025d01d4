//! Error types for provider calls

use thiserror::Error;

/// Coarse failure classes used for logging and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Connection failure, non-2xx status or timeout
	Transport,
	/// Response text could not be decoded into the item schema
	Parse,
	/// Response decoded but contained no items
	EmptyResult,
	/// The call was never attempted because its inputs were unusable
	InvalidRequest,
}

/// Failure of a single provider call
///
/// Every variant carries the provider id so that outcomes can be reported
/// without extra bookkeeping once they leave the task that produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
	#[error("Provider {provider_id} transport error: {reason}")]
	Transport { provider_id: String, reason: String },

	#[error("Provider {provider_id} returned HTTP {status_code}: {reason}")]
	HttpStatus {
		provider_id: String,
		status_code: u16,
		reason: String,
	},

	#[error("Provider {provider_id} timed out after {timeout_ms}ms")]
	Timeout { provider_id: String, timeout_ms: u64 },

	#[error("Provider {provider_id} returned an unparseable response: {reason}")]
	Parse { provider_id: String, reason: String },

	#[error("Provider {provider_id} returned no items")]
	EmptyResult { provider_id: String },

	#[error("Invalid request for provider {provider_id}: {reason}")]
	InvalidInput { provider_id: String, reason: String },

	#[error("No adapter '{adapter_id}' registered for provider {provider_id}")]
	AdapterNotFound {
		provider_id: String,
		adapter_id: String,
	},
}

impl ProviderError {
	/// Provider that produced this error
	pub fn provider_id(&self) -> &str {
		match self {
			ProviderError::Transport { provider_id, .. }
			| ProviderError::HttpStatus { provider_id, .. }
			| ProviderError::Timeout { provider_id, .. }
			| ProviderError::Parse { provider_id, .. }
			| ProviderError::EmptyResult { provider_id }
			| ProviderError::InvalidInput { provider_id, .. }
			| ProviderError::AdapterNotFound { provider_id, .. } => provider_id,
		}
	}

	pub fn kind(&self) -> ProviderErrorKind {
		match self {
			ProviderError::Transport { .. }
			| ProviderError::HttpStatus { .. }
			| ProviderError::Timeout { .. } => ProviderErrorKind::Transport,
			ProviderError::Parse { .. } => ProviderErrorKind::Parse,
			ProviderError::EmptyResult { .. } => ProviderErrorKind::EmptyResult,
			ProviderError::InvalidInput { .. } | ProviderError::AdapterNotFound { .. } => {
				ProviderErrorKind::InvalidRequest
			},
		}
	}

	/// Extract HTTP status code from the error if available
	pub fn status_code(&self) -> Option<u16> {
		match self {
			ProviderError::HttpStatus { status_code, .. } => Some(*status_code),
			_ => None,
		}
	}

	/// Create an HTTP status error with a default reason for common codes
	pub fn from_http_status(provider_id: impl Into<String>, status_code: u16) -> Self {
		let reason = match status_code {
			400 => "Bad Request".to_string(),
			401 => "Unauthorized".to_string(),
			403 => "Forbidden".to_string(),
			404 => "Not Found".to_string(),
			408 => "Request Timeout".to_string(),
			413 => "Payload Too Large".to_string(),
			429 => "Too Many Requests".to_string(),
			500 => "Internal Server Error".to_string(),
			502 => "Bad Gateway".to_string(),
			503 => "Service Unavailable".to_string(),
			504 => "Gateway Timeout".to_string(),
			_ => format!("HTTP Error {}", status_code),
		};

		Self::HttpStatus {
			provider_id: provider_id.into(),
			status_code,
			reason,
		}
	}
}

pub type ProviderResult<T> = Result<T, ProviderError>;
