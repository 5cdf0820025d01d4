//! Merging per-provider reports into one normalized record

use std::collections::HashMap;

use nutriscan_types::{
	round_tenth, round_whole, Confidence, LineItem, MeasureTotals, MergeStrategy,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::invoker::SourceReport;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
	#[error("No items to aggregate")]
	Empty,
}

/// Output of the aggregator, before ids, timestamps and signatures are added
#[derive(Debug, Clone, PartialEq)]
pub struct MergedAnalysis {
	pub items: Vec<LineItem>,
	pub totals: MeasureTotals,
	pub providers_used: usize,
	pub contributing_providers: Vec<String>,
	pub confidence: Confidence,
}

/// Running state for one normalized key
#[derive(Debug, Clone)]
struct MergeSlot {
	item: LineItem,
	sums: [f64; 5],
	count: usize,
}

impl MergeSlot {
	fn new(item: &LineItem) -> Self {
		Self {
			sums: measures(item),
			item: item.clone(),
			count: 1,
		}
	}

	fn absorb(&mut self, incoming: &LineItem, strategy: MergeStrategy) {
		self.count += 1;
		let incoming_values = measures(incoming);
		for (sum, value) in self.sums.iter_mut().zip(incoming_values) {
			*sum += value;
		}

		match strategy {
			MergeStrategy::PairwiseAverage => {
				let current = measures(&self.item);
				let mut averaged = [0.0; 5];
				for (i, slot) in averaged.iter_mut().enumerate() {
					*slot = (current[i] + incoming_values[i]) / 2.0;
				}
				apply_rounded(&mut self.item, averaged);
			},
			MergeStrategy::RunningMean => {
				let count = self.count as f64;
				let mut means = self.sums;
				for mean in means.iter_mut() {
					*mean /= count;
				}
				apply_rounded(&mut self.item, means);
			},
		}
	}
}

/// `[quantity, calories, carbs, fats, proteins]`
fn measures(item: &LineItem) -> [f64; 5] {
	[item.quantity, item.calories, item.carbs, item.fats, item.proteins]
}

/// One decimal, but a positive quantity never rounds away to zero
fn round_quantity(value: f64) -> f64 {
	let rounded = round_tenth(value);
	if rounded <= 0.0 && value > 0.0 {
		value
	} else {
		rounded
	}
}

fn apply_rounded(item: &mut LineItem, values: [f64; 5]) {
	item.quantity = round_quantity(values[0]);
	item.calories = round_whole(values[1]);
	item.carbs = round_tenth(values[2]);
	item.fats = round_tenth(values[3]);
	item.proteins = round_tenth(values[4]);
}

/// Sum items sharing a key within one report, keeping first-seen order
///
/// Two portions of the same food from one provider are both on the plate;
/// only estimates from different providers are averaged.
fn combine_duplicates(items: &[LineItem]) -> Vec<LineItem> {
	let mut combined: Vec<LineItem> = Vec::with_capacity(items.len());
	for item in items {
		let key = item.normalized_key();
		match combined.iter_mut().find(|c| c.normalized_key() == key) {
			Some(existing) => {
				existing.quantity += item.quantity;
				existing.calories += item.calories;
				existing.carbs += item.carbs;
				existing.fats += item.fats;
				existing.proteins += item.proteins;
			},
			None => combined.push(item.clone()),
		}
	}
	combined
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
	strategy: MergeStrategy,
}

impl Aggregator {
	pub fn new(strategy: MergeStrategy) -> Self {
		Self { strategy }
	}

	pub fn strategy(&self) -> MergeStrategy {
		self.strategy
	}

	/// Merge successful reports, given in arrival order
	///
	/// A single report passes through untouched, totals included. With more
	/// than one, items are matched on their normalized name and their
	/// estimates combined with the configured strategy; the first-seen item
	/// keeps its display name and unit. Totals are recomputed from the merged
	/// items.
	pub fn aggregate(&self, sources: &[SourceReport]) -> Result<MergedAnalysis, AggregationError> {
		let contributing_providers: Vec<String> =
			sources.iter().map(|s| s.provider_id.clone()).collect();

		if let [single] = sources {
			if single.report.items.is_empty() {
				return Err(AggregationError::Empty);
			}
			debug!("Single source from {}, passing through", single.provider_id);
			return Ok(MergedAnalysis {
				items: single.report.items.clone(),
				totals: single.report.totals,
				providers_used: 1,
				contributing_providers,
				confidence: Confidence::from_provider_count(1),
			});
		}

		let mut order: Vec<String> = Vec::new();
		let mut slots: HashMap<String, MergeSlot> = HashMap::new();

		for source in sources {
			for item in combine_duplicates(&source.report.items) {
				let key = item.normalized_key();
				match slots.get_mut(&key) {
					Some(slot) => slot.absorb(&item, self.strategy),
					None => {
						order.push(key.clone());
						slots.insert(key, MergeSlot::new(&item));
					},
				}
			}
		}

		let items: Vec<LineItem> = order
			.iter()
			.filter_map(|key| slots.remove(key).map(|slot| slot.item))
			.collect();

		if items.is_empty() {
			return Err(AggregationError::Empty);
		}

		let totals = MeasureTotals::from_items(&items);
		info!(
			"Merged {} reports into {} items using {}",
			sources.len(),
			items.len(),
			self.strategy
		);

		Ok(MergedAnalysis {
			items,
			totals,
			providers_used: sources.len(),
			contributing_providers,
			confidence: Confidence::from_provider_count(sources.len()),
		})
	}
}
