//! Canned provider payloads

use nutriscan::serde_json::{json, Value};
use nutriscan::LineItem;

/// The JSON document a well-behaved model returns for `items`
#[allow(dead_code)]
pub fn meal_json(items: &[LineItem]) -> String {
	json!({ "items": items }).to_string()
}

/// OpenAI chat completion wrapping `content` as the assistant message
#[allow(dead_code)]
pub fn openai_completion(content: &str) -> Value {
	json!({
		"id": "chatcmpl-test",
		"object": "chat.completion",
		"choices": [{
			"index": 0,
			"message": {"role": "assistant", "content": content},
			"finish_reason": "stop"
		}]
	})
}

/// Gemini generateContent response with `text` as the single part
#[allow(dead_code)]
pub fn gemini_candidate(text: &str) -> Value {
	json!({
		"candidates": [{
			"content": {"role": "model", "parts": [{"text": text}]},
			"finishReason": "STOP"
		}]
	})
}

#[allow(dead_code)]
pub fn rice(quantity: f64, calories: f64) -> LineItem {
	LineItem::new("Rice", quantity, "g", calories, 44.0, 0.4, 4.0)
}

#[allow(dead_code)]
pub fn broccoli() -> LineItem {
	LineItem::new("Broccoli", 80.0, "g", 27.0, 5.3, 0.3, 2.3)
}
