//! Final analysis result returned to callers

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{LineItem, MeasureTotals};
use crate::IntegrityPayload;

/// Coarse trust label derived from how many providers agreed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
	/// Two or more providers contributed
	High,
	/// A single provider from the concurrent fan-out contributed
	Medium,
	/// Produced by the centralized fallback provider
	Low,
}

impl Confidence {
	/// Grade for a fan-out result given the number of contributing providers
	pub fn from_provider_count(providers_used: usize) -> Self {
		if providers_used >= 2 {
			Confidence::High
		} else {
			Confidence::Medium
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Confidence::High => "high",
			Confidence::Medium => "medium",
			Confidence::Low => "low",
		}
	}
}

impl fmt::Display for Confidence {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Which path of the engine produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
	MultiProvider,
	SingleProviderFallback,
}

impl ExecutionMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			ExecutionMode::MultiProvider => "multi-provider",
			ExecutionMode::SingleProviderFallback => "single-provider-fallback",
		}
	}
}

impl fmt::Display for ExecutionMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Attestation binding a result to the identity that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityProof {
	/// SHA-256 hex digest of the canonical payload
	pub digest: String,
	/// Keyed signature over the canonical payload
	pub signature: String,
	/// Name of the signing identity
	pub signer_id: String,
	/// Signature algorithm, e.g. `HMAC-SHA256`
	pub algorithm: String,
}

/// Normalized result of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
	pub analysis_id: String,
	pub items: Vec<LineItem>,
	pub totals: MeasureTotals,
	/// Providers whose reports contributed to `items`
	pub providers_used: usize,
	/// Providers dispatched in total, fallback included
	pub providers_attempted: usize,
	pub contributing_providers: Vec<String>,
	pub confidence: Confidence,
	pub timestamp: DateTime<Utc>,
	pub mode: ExecutionMode,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub integrity: Option<IntegrityProof>,
}

impl AnalysisResult {
	/// Whether the result carries an integrity proof
	pub fn is_signed(&self) -> bool {
		self.integrity.is_some()
	}
}

/// Shortest representation that parses back to the same `f64`
fn format_number(value: f64) -> String {
	format!("{}", value)
}

impl IntegrityPayload for AnalysisResult {
	/// Canonical form: everything except the proof itself, items in key order
	///
	/// Names are written as reported and numbers without loss, so any edit to
	/// a protected field changes the payload.
	fn to_integrity_payload(&self) -> String {
		let mut items: Vec<&LineItem> = self.items.iter().collect();
		items.sort_by(|a, b| {
			a.normalized_key()
				.cmp(&b.normalized_key())
				.then_with(|| a.name.cmp(&b.name))
		});

		let items_payload = items
			.iter()
			.map(|item| {
				format!(
					"{}:{}:{}:{}:{}:{}:{}",
					item.name,
					format_number(item.quantity),
					item.unit,
					format_number(item.calories),
					format_number(item.carbs),
					format_number(item.fats),
					format_number(item.proteins)
				)
			})
			.collect::<Vec<_>>()
			.join(";");

		let mut providers = self.contributing_providers.clone();
		providers.sort();

		format!(
			"analysis_id={}|mode={}|timestamp={}|providers_used={}|providers_attempted={}|providers={}|confidence={}|totals={}:{}:{}:{}|items={}",
			self.analysis_id,
			self.mode,
			self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
			self.providers_used,
			self.providers_attempted,
			providers.join(","),
			self.confidence,
			format_number(self.totals.calories),
			format_number(self.totals.carbs),
			format_number(self.totals.fats),
			format_number(self.totals.proteins),
			items_payload
		)
	}
}
