//! Instruction sent alongside the image

use nutriscan_types::AnalysisInput;

/// Default instruction describing the exact JSON shape we parse
pub const DEFAULT_INSTRUCTION: &str = "Identify every distinct food or drink visible in this image. \
Respond with a single JSON object and nothing else, using exactly this shape: \
{\"items\": [{\"name\": string, \"quantity\": number, \"unit\": string, \"calories\": number, \
\"carbs\": number, \"fats\": number, \"proteins\": number}], \
\"totals\": {\"calories\": number, \"carbs\": number, \"fats\": number, \"proteins\": number}}. \
Quantities must be greater than zero. Calories are kcal, carbs, fats and proteins are grams. \
If no food is visible, return {\"items\": []}.";

/// Instruction for a given input, honoring caller overrides
pub fn instruction_for(input: &AnalysisInput) -> &str {
	input
		.instruction
		.as_deref()
		.filter(|s| !s.trim().is_empty())
		.unwrap_or(DEFAULT_INSTRUCTION)
}
