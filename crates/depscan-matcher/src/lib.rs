//! Naive whole-word dependency matching over a crawled file tree
//!
//! Two strategies implement the [`Matcher`] contract:
//!
//! - [`MatcherPool`] keeps N worker threads alive across runs. Each run hands
//!   every worker a contiguous partition of candidate files; the driver then
//!   streams every line of every file to all workers in lock-step rounds.
//! - [`DoubleScan`] does the same comparisons sequentially on the calling
//!   thread, which is cheaper for small trees.
//!
//! Either way, for every ordered pair of files (A, B) with A ≠ B, an edge
//! `A -> B` is recorded when some line of B contains A's stem as a whole word.

pub mod cancel;
pub mod crawler;
pub mod double_scan;
pub mod error;
pub mod lines;
pub mod partition;
pub mod pool;
pub mod strategy;
pub mod word;

#[cfg(test)]
mod test_utils;

pub use cancel::CancelFlag;
pub use crawler::{list_files, list_immediate_subdirectories};
pub use double_scan::DoubleScan;
pub use error::{ConcurrencyFault, MatchError, MatchResult};
pub use partition::partitions;
pub use pool::MatcherPool;
pub use strategy::{FileSet, Matcher, RunStats};
pub use word::StemPattern;
