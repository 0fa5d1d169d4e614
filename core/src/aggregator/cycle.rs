//! One aggregation pass:
//!
//! 1. List objects under the configured prefix
//! 2. Record each object's name and version, parse each payload
//! 3. Compare with the last published state
//! 4. If anything changed, publish the merged scope set and remember what
//!    was published
//!
//! A failed publish leaves the state untouched, so the next cycle sees the
//! same change and tries again.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::change::{AggregatorState, Change, Observation};
use crate::error::CycleError;
use crate::snapshot::SnapshotStore;
use crate::store::ConfigStore;
use crate::types::{ConfigObject, ScopeSnapshot};

/// Result of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing changed since the last publish.
    Unchanged,
    Published {
        change: Change,
        objects: usize,
        /// Scopes collected before deduplication.
        collected: usize,
        unique: usize,
        /// Payloads that failed to parse.
        skipped: usize,
        path: PathBuf,
    },
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published { .. })
    }
}

pub struct Aggregator<S: ConfigStore> {
    store: S,
    snapshots: SnapshotStore,
    prefix: String,
    state: AggregatorState,
    clock: fn() -> DateTime<Utc>,
}

impl<S: ConfigStore> Aggregator<S> {
    pub fn new(store: S, snapshots: SnapshotStore, prefix: &str) -> Self {
        Aggregator {
            store,
            snapshots,
            prefix: prefix.to_string(),
            state: AggregatorState::new(),
            clock: Utc::now,
        }
    }

    /// Replace the timestamp source used for `lastUpdated`.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &AggregatorState {
        &self.state
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let objects = self.store.list_objects(&self.prefix)?;
        let observed = observe(&objects, &self.prefix);

        let change = match self.state.detect(&observed) {
            Some(change) => change,
            None => {
                debug!(objects = observed.object_count(), "no config object changes");
                return Ok(CycleOutcome::Unchanged);
            }
        };
        info!(%change, "config object set or content changed, processing");

        let collected = observed.scopes.len();
        let snapshot = ScopeSnapshot::from_scopes(observed.scopes.iter().cloned(), (self.clock)());
        let unique = snapshot.len();
        let skipped = observed.skipped_payloads;
        info!(collected, unique, skipped, "collected scopes");

        let path = self.snapshots.publish(&snapshot)?;
        self.state.record(&observed);
        info!(
            objects = observed.object_count(),
            unique,
            path = %path.display(),
            "wrote combined scope configuration"
        );

        Ok(CycleOutcome::Published {
            change,
            objects: observed.object_count(),
            collected,
            unique,
            skipped,
            path,
        })
    }
}

/// Filter objects by prefix and gather names, versions and scopes.
/// Payloads that do not parse are logged and skipped.
pub fn observe(objects: &[ConfigObject], prefix: &str) -> Observation {
    let mut observed = Observation::default();
    for object in objects.iter().filter(|o| o.name.starts_with(prefix)) {
        observed.record_object(&object.name, &object.version);
        for (key, parsed) in object.declarations() {
            match parsed {
                Ok(declaration) => {
                    debug!(object = %object.name, key, scopes = declaration.scopes.len(), "parsed scope declaration");
                    observed.scopes.extend(declaration.scopes);
                }
                Err(e) => {
                    warn!(object = %object.name, key, error = %e, "failed to parse scope declaration");
                    observed.skipped_payloads += 1;
                }
            }
        }
    }
    observed
}
