//! Adapter for OpenAI-compatible chat completion endpoints
//!
//! Sends the instruction and the image as a single multimodal user message to
//! `{endpoint}/chat/completions` and reads `choices[0].message.content`.

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

pub const OPENAI_ADAPTER_ID: &str = "openai-chat-v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
	model: &'a str,
	messages: Vec<ChatMessage<'a>>,
	temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
	role: &'static str,
	content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
	Text { text: &'a str },
	ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
	url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
	#[serde(default)]
	choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
	message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
	#[serde(default)]
	content: Option<String>,
}

/// OpenAI chat completions adapter
#[derive(Debug)]
pub struct OpenAiAdapter {
	info: AdapterInfo,
	cache: ClientCache,
}

impl OpenAiAdapter {
	/// Adapter backed by the shared client pool
	pub fn new() -> Self {
		Self::with_cache(ClientCache::for_adapter())
	}

	pub fn with_cache(cache: ClientCache) -> Self {
		Self {
			info: AdapterInfo::new(OPENAI_ADAPTER_ID, "OpenAI Chat Completions", "1.0.0"),
			cache,
		}
	}

	fn build_request<'a>(input: &'a AnalysisInput, model: &'a str) -> ChatRequest<'a> {
		ChatRequest {
			model,
			messages: vec![ChatMessage {
				role: "user",
				content: vec![
					ContentPart::Text {
						text: instruction_for(input),
					},
					ContentPart::ImageUrl {
						image_url: ImageUrl {
							url: input.data_url(),
						},
					},
				],
			}],
			temperature: 0.0,
		}
	}

	/// Pull the assistant text out of a chat completion body
	fn extract_content(provider_id: &str, body: &str) -> ProviderResult<String> {
		let response: ChatResponse =
			serde_json::from_str(body).map_err(|e| ProviderError::Parse {
				provider_id: provider_id.to_string(),
				reason: format!("malformed chat completion: {}", e),
			})?;

		let choice = response
			.choices
			.into_iter()
			.next()
			.ok_or_else(|| ProviderError::EmptyResult {
				provider_id: provider_id.to_string(),
			})?;

		match choice.message.content {
			Some(content) if !content.trim().is_empty() => Ok(content),
			_ => Err(ProviderError::EmptyResult {
				provider_id: provider_id.to_string(),
			}),
		}
	}
}

impl Default for OpenAiAdapter {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
	fn adapter_info(&self) -> &AdapterInfo {
		&self.info
	}

	async fn analyze(
		&self,
		input: &AnalysisInput,
		config: &ProviderRuntimeConfig,
	) -> ProviderResult<ProviderReport> {
		let url = build_url(&config.provider_id, &config.endpoint, "chat/completions")?;
		let client = self.cache.get_client_for(config)?;

		let request = Self::build_request(input, &config.model);
		let auth = AuthConfig::bearer(&config.credential);
		let body = post_json(&client, &url, &request, config, &auth).await?;
		let content = Self::extract_content(&config.provider_id, &body)?;

		debug!(
			"Provider {} returned {} characters of model output",
			config.provider_id,
			content.len()
		);
		parse_report(&config.provider_id, &content)
	}
}
