//! Adapter for the Gemini `generateContent` API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use nutriscan_types::{
	AdapterInfo, AnalysisInput, ProviderAdapter, ProviderError, ProviderReport, ProviderResult,
	ProviderRuntimeConfig,
};

use crate::client_cache::{AuthConfig, ClientCache};
use crate::http::{build_url, post_json};
use crate::prompt::instruction_for;
use crate::response_parser::parse_report;

pub const GEMINI_ADAPTER_ID: &str = "gemini-v1";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
	contents: Vec<RequestContent<'a>>,
	#[serde(rename = "generationConfig")]
	generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
	role: &'static str,
	parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
	Text {
		text: &'a str,
	},
	InlineData {
		inline_data: InlineData<'a>,
	},
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
	mime_type: &'a str,
	data: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
	temperature: f32,
	#[serde(rename = "responseMimeType")]
	response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
	#[serde(default)]
	candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
	#[serde(default)]
	content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
	#[serde(default)]
	parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
	#[serde(default)]
	text: Option<String>,
}

/// Gemini adapter; the credential travels in the `x-goog-api-key` header
#[derive(Debug)]
pub struct GeminiAdapter {
	info: AdapterInfo,
	cache: ClientCache,
}

impl GeminiAdapter {
	pub fn new() -> Self {
		Self::with_cache(ClientCache::for_adapter())
	}

	pub fn with_cache(cache: ClientCache) -> Self {
		Self {
			info: AdapterInfo::new(GEMINI_ADAPTER_ID, "Google Gemini", "1.0.0"),
			cache,
		}
	}

	fn build_request(input: &AnalysisInput) -> GenerateRequest<'_> {
		GenerateRequest {
			contents: vec![RequestContent {
				role: "user",
				parts: vec![
					RequestPart::Text {
						text: instruction_for(input),
					},
					RequestPart::InlineData {
						inline_data: InlineData {
							mime_type: &input.mime_type,
							data: &input.image_base64,
						},
					},
				],
			}],
			generation_config: GenerationConfig {
				temperature: 0.0,
				response_mime_type: "application/json",
			},
		}
	}

	/// Concatenate the text parts of the first candidate
	fn extract_text(provider_id: &str, body: &str) -> ProviderResult<String> {
		let response: GenerateResponse =
			serde_json::from_str(body).map_err(|e| ProviderError::Parse {
				provider_id: provider_id.to_string(),
				reason: format!("malformed generateContent response: {}", e),
			})?;

		let text: String = response
			.candidates
			.into_iter()
			.next()
			.and_then(|candidate| candidate.content)
			.map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
			.unwrap_or_default();

		if text.trim().is_empty() {
			return Err(ProviderError::EmptyResult {
				provider_id: provider_id.to_string(),
			});
		}
		Ok(text)
	}
}

impl Default for GeminiAdapter {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
	fn adapter_info(&self) -> &AdapterInfo {
		&self.info
	}

	async fn analyze(
		&self,
		input: &AnalysisInput,
		config: &ProviderRuntimeConfig,
	) -> ProviderResult<ProviderReport> {
		let path = format!("models/{}:generateContent", config.model);
		let url = build_url(&config.provider_id, &config.endpoint, &path)?;
		let client = self.cache.get_client_for(config)?;

		let request = Self::build_request(input);
		let auth = AuthConfig::api_key(API_KEY_HEADER, &config.credential);
		let body = post_json(&client, &url, &request, config, &auth).await?;
		let text = Self::extract_text(&config.provider_id, &body)?;

		debug!(
			"Provider {} returned {} characters of model output",
			config.provider_id,
			text.len()
		);
		parse_report(&config.provider_id, &text)
	}
}
