//! Structured report produced by a single provider
//!
//! Provider responses are untyped text. Once an adapter has isolated the JSON
//! object, it is decoded into the strict wire schema below and validated before
//! anything downstream gets to see it.

use serde::{Deserialize, Serialize};

use super::{LineItem, MeasureTotals};
use crate::providers::ProviderError;

/// Wire shape requested from every provider
#[derive(Debug, Clone, Deserialize)]
struct WireReport {
	items: Vec<LineItem>,
	#[serde(default)]
	totals: Option<MeasureTotals>,
}

/// A validated item list (with totals) from one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReport {
	pub items: Vec<LineItem>,
	pub totals: MeasureTotals,
}

impl ProviderReport {
	/// Build a report from items, computing totals from them
	pub fn from_items(items: Vec<LineItem>) -> Self {
		let totals = MeasureTotals::from_items(&items);
		Self { items, totals }
	}

	/// Decode and validate a provider's JSON payload
	///
	/// Missing `items`, wrong types and invalid values are all parse failures.
	/// An empty item list is reported separately so the caller can tell
	/// "nothing recognized" apart from "garbage".
	pub fn from_json(provider_id: &str, json: &str) -> Result<Self, ProviderError> {
		let wire: WireReport =
			serde_json::from_str(json).map_err(|e| ProviderError::Parse {
				provider_id: provider_id.to_string(),
				reason: format!("response does not match the item schema: {}", e),
			})?;

		if wire.items.is_empty() {
			return Err(ProviderError::EmptyResult {
				provider_id: provider_id.to_string(),
			});
		}

		for item in &wire.items {
			item.validate().map_err(|reason| ProviderError::Parse {
				provider_id: provider_id.to_string(),
				reason,
			})?;
		}

		let totals = match wire.totals {
			Some(totals) => {
				totals.validate().map_err(|reason| ProviderError::Parse {
					provider_id: provider_id.to_string(),
					reason,
				})?;
				totals
			},
			None => MeasureTotals::from_items(&wire.items),
		};

		Ok(Self {
			items: wire.items,
			totals,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const VALID: &str = r#"{
		"items": [
			{"name": "Rice", "quantity": 150, "unit": "g", "calories": 200, "carbs": 44.5, "fats": 0.4, "proteins": 4.1},
			{"name": "Chicken breast", "quantity": 120, "unit": "g", "calories": 198, "carbs": 0, "fats": 4.3, "proteins": 37.2}
		],
		"totals": {"calories": 398, "carbs": 44.5, "fats": 4.7, "proteins": 41.3}
	}"#;

	#[test]
	fn test_parse_valid_report_keeps_reported_totals() {
		let report = ProviderReport::from_json("p1", VALID).unwrap();
		assert_eq!(report.items.len(), 2);
		assert_eq!(report.items[0].name, "Rice");
		assert_eq!(report.totals.calories, 398.0);
		assert_eq!(report.totals.proteins, 41.3);
	}

	#[test]
	fn test_missing_totals_are_recomputed() {
		let json = r#"{"items": [{"name": "Apple", "quantity": 1, "unit": "piece", "calories": 95, "carbs": 25, "fats": 0.3, "proteins": 0.5}]}"#;
		let report = ProviderReport::from_json("p1", json).unwrap();
		assert_eq!(report.totals.calories, 95.0);
		assert_eq!(report.totals.carbs, 25.0);
	}

	#[test]
	fn test_missing_items_is_parse_error() {
		let json = r#"{"totals": {"calories": 1, "carbs": 1, "fats": 1, "proteins": 1}}"#;
		let err = ProviderReport::from_json("p1", json).unwrap_err();
		assert!(matches!(err, ProviderError::Parse { .. }));
	}

	#[test]
	fn test_empty_items_is_empty_result() {
		let err = ProviderReport::from_json("p1", r#"{"items": []}"#).unwrap_err();
		assert!(matches!(err, ProviderError::EmptyResult { .. }));
	}

	#[test]
	fn test_wrong_types_and_negative_values_rejected() {
		let as_string = r#"{"items": [{"name": "Rice", "quantity": "150", "unit": "g", "calories": 200, "carbs": 1, "fats": 1, "proteins": 1}]}"#;
		assert!(matches!(
			ProviderReport::from_json("p1", as_string),
			Err(ProviderError::Parse { .. })
		));

		let negative = r#"{"items": [{"name": "Rice", "quantity": 150, "unit": "g", "calories": -5, "carbs": 1, "fats": 1, "proteins": 1}]}"#;
		assert!(matches!(
			ProviderReport::from_json("p1", negative),
			Err(ProviderError::Parse { .. })
		));
	}
}
