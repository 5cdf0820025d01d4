//! Analysis domain models: line items, per-provider reports and final results

pub mod line_item;
pub mod report;
pub mod result;
pub mod strategy;

pub use line_item::{normalize_item_name, round_tenth, round_whole, LineItem, MeasureTotals};
pub use report::ProviderReport;
pub use result::{AnalysisResult, Confidence, ExecutionMode, IntegrityProof};
pub use strategy::MergeStrategy;
