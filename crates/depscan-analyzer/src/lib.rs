//! Analysis orchestration: checkout, crawl, match, persist

pub mod analyzer;
pub mod demo;
pub mod error;

#[cfg(test)]
mod tests;

pub use analyzer::{AnalysisReport, Analyzer, BatchOutcome};
pub use demo::{DemoSize, demo_graph};
pub use error::{AnalyzerError, AnalyzerResult};
