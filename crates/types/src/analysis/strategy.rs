//! Rules for reconciling numeric estimates across providers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How conflicting estimates for the same item are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
	/// `new = round((existing + incoming) / 2)`, applied in arrival order.
	/// With three or more providers later arrivals weigh more.
	#[default]
	PairwiseAverage,
	/// Arithmetic mean of every estimate, independent of arrival order
	RunningMean,
}

impl MergeStrategy {
	pub fn as_str(&self) -> &'static str {
		match self {
			MergeStrategy::PairwiseAverage => "pairwise-average",
			MergeStrategy::RunningMean => "running-mean",
		}
	}
}

impl fmt::Display for MergeStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for MergeStrategy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"pairwise-average" | "pairwise" => Ok(MergeStrategy::PairwiseAverage),
			"running-mean" | "mean" => Ok(MergeStrategy::RunningMean),
			other => Err(format!("unknown merge strategy '{}'", other)),
		}
	}
}
