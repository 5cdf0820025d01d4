//! Turning model output text into a validated report
//!
//! Models are asked for bare JSON but routinely wrap it in markdown fences or
//! a sentence of prose. We isolate the outermost object and hand it to the
//! strict decoder in `nutriscan_types`.

use nutriscan_types::{ProviderError, ProviderReport, ProviderResult};

/// Locate the JSON object inside a model response
pub fn extract_json_object(text: &str) -> Option<&str> {
	let trimmed = text.trim();
	if trimmed.starts_with('{') && trimmed.ends_with('}') {
		return Some(trimmed);
	}

	let body = strip_code_fence(trimmed).unwrap_or(trimmed);
	let start = body.find('{')?;
	let end = body.rfind('}')?;
	if start < end {
		Some(&body[start..=end])
	} else {
		None
	}
}

fn strip_code_fence(text: &str) -> Option<&str> {
	let open = text.find("```")?;
	let after_open = &text[open + 3..];
	// skip the language tag, if any
	let content_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
	let content = &after_open[content_start..];
	let close = content.find("```")?;
	Some(content[..close].trim())
}

/// Parse a model response into a [`ProviderReport`]
pub fn parse_report(provider_id: &str, text: &str) -> ProviderResult<ProviderReport> {
	if text.trim().is_empty() {
		return Err(ProviderError::EmptyResult {
			provider_id: provider_id.to_string(),
		});
	}

	let json = extract_json_object(text).ok_or_else(|| ProviderError::Parse {
		provider_id: provider_id.to_string(),
		reason: "no JSON object found in model output".to_string(),
	})?;

	ProviderReport::from_json(provider_id, json)
}
