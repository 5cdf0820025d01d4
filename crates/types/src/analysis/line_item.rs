//! Line items and measure totals reported by inference providers

use serde::{Deserialize, Serialize};

/// One identified food entity within the analyzed image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
	/// Free-text label as reported by the provider
	pub name: String,
	/// Estimated amount, strictly positive
	pub quantity: f64,
	/// Unit of `quantity` (grams, pieces, cups, ...)
	#[serde(default)]
	pub unit: String,
	pub calories: f64,
	pub carbs: f64,
	pub fats: f64,
	pub proteins: f64,
}

impl LineItem {
	/// Create a new line item
	pub fn new(
		name: impl Into<String>,
		quantity: f64,
		unit: impl Into<String>,
		calories: f64,
		carbs: f64,
		fats: f64,
		proteins: f64,
	) -> Self {
		Self {
			name: name.into(),
			quantity,
			unit: unit.into(),
			calories,
			carbs,
			fats,
			proteins,
		}
	}

	/// Key used to match equivalent items reported by different providers
	pub fn normalized_key(&self) -> String {
		normalize_item_name(&self.name)
	}

	/// Validate the item invariants
	///
	/// Quantity must be strictly positive; every measure must be finite and
	/// non-negative; the name must not be blank.
	pub fn validate(&self) -> Result<(), String> {
		if self.name.trim().is_empty() {
			return Err("item name must not be empty".to_string());
		}
		if !self.quantity.is_finite() || self.quantity <= 0.0 {
			return Err(format!(
				"item '{}' has invalid quantity {}",
				self.name, self.quantity
			));
		}
		for (field, value) in [
			("calories", self.calories),
			("carbs", self.carbs),
			("fats", self.fats),
			("proteins", self.proteins),
		] {
			if !value.is_finite() || value < 0.0 {
				return Err(format!(
					"item '{}' has invalid {} value {}",
					self.name, field, value
				));
			}
		}
		Ok(())
	}
}

/// Lowercase, trimmed form of an item name
pub fn normalize_item_name(name: &str) -> String {
	name.trim().to_lowercase()
}

/// Aggregate of each measure across a set of items
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureTotals {
	pub calories: f64,
	pub carbs: f64,
	pub fats: f64,
	pub proteins: f64,
}

impl MeasureTotals {
	/// Sum the measures of the given items
	///
	/// Items are summed in normalized-key order so that the result does not
	/// depend on the order the items were collected in. Calories are rounded
	/// to whole units and the remaining measures to one decimal.
	pub fn from_items(items: &[LineItem]) -> Self {
		let mut ordered: Vec<&LineItem> = items.iter().collect();
		ordered.sort_by(|a, b| {
			a.normalized_key()
				.cmp(&b.normalized_key())
				.then_with(|| a.name.cmp(&b.name))
		});

		let mut totals = ordered
			.into_iter()
			.fold(MeasureTotals::default(), |mut acc, item| {
				acc.calories += item.calories;
				acc.carbs += item.carbs;
				acc.fats += item.fats;
				acc.proteins += item.proteins;
				acc
			});

		totals.calories = round_whole(totals.calories);
		totals.carbs = round_tenth(totals.carbs);
		totals.fats = round_tenth(totals.fats);
		totals.proteins = round_tenth(totals.proteins);
		totals
	}

	/// Validate that every total is finite and non-negative
	pub fn validate(&self) -> Result<(), String> {
		for (field, value) in [
			("calories", self.calories),
			("carbs", self.carbs),
			("fats", self.fats),
			("proteins", self.proteins),
		] {
			if !value.is_finite() || value < 0.0 {
				return Err(format!("totals has invalid {} value {}", field, value));
			}
		}
		Ok(())
	}
}

/// Round to the nearest whole unit
pub fn round_whole(value: f64) -> f64 {
	value.round()
}

/// Round to one decimal place
pub fn round_tenth(value: f64) -> f64 {
	(value * 10.0).round() / 10.0
}
