//! Scope gate core: decides which container repositories need signature
//! verification and wraps the external verification engine.
//!
//! Two processes share this crate:
//!
//! - the monitor (`daemon`, `aggregator`) polls a `ConfigStore` for scope
//!   declarations, merges them and publishes a `ScopeSnapshot` through the
//!   `SnapshotStore` whenever the observed objects change;
//! - the verifier (`gate`) reads the latest snapshot, skips repositories that
//!   are out of scope and otherwise runs the verification engine, turning
//!   its JSON verdict into a process exit code.
//!
//! The snapshot file is the only thing the two share. It is replaced with an
//! atomic rename, so readers always see a complete snapshot.

pub mod aggregator;
pub mod daemon;
pub mod error;
pub mod exit_codes;
pub mod gate;
pub mod infrastructure;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod types;

pub use aggregator::{Aggregator, AggregatorState, Change, CycleOutcome};
pub use gate::{Gate, GateOutcome};
pub use snapshot::SnapshotStore;
pub use types::{ConfigObject, ScopeDeclaration, ScopeSnapshot};
