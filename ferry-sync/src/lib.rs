//! Copy/synchronization engine for ferry
//!
//! Decides what needs to move (skip strategies over cheap metadata and
//! content digests) and moves it (streaming copies with per-item fault
//! isolation and progress reporting).

pub mod copy;
pub mod filter;
pub mod resolver;
pub mod skip;

pub use copy::{BatchItem, BatchReport, CopyCallbacks, CopyEngine, CopyOutcome};
pub use filter::{FilterPredicate, TreeFilter};
pub use resolver::{Digest, DigestSource, NodeMetadata};
pub use skip::{SkipDecision, SkipEvaluator, SkipPredicate, SkipStrategy};
