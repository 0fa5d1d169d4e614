//! Aggregator: merges scope declarations from many config objects into one
//! published snapshot.
//!
//! The `change` module holds the last-seen object names and versions and
//! decides whether a new publish is needed. The `cycle` module runs one
//! list → parse → detect → publish pass.

pub mod change;
pub mod cycle;

pub use change::{AggregatorState, Change, Observation};
pub use cycle::{Aggregator, CycleOutcome};
