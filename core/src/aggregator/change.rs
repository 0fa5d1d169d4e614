use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// What one cycle saw in the store, after prefix filtering and payload
/// parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    pub names: BTreeSet<String>,
    pub versions: BTreeMap<String, String>,
    /// Every scope from every parsed payload, duplicates included.
    pub scopes: Vec<String>,
    /// Payloads that failed to parse and were skipped.
    pub skipped_payloads: usize,
}

impl Observation {
    pub fn record_object(&mut self, name: &str, version: &str) {
        self.names.insert(name.to_string());
        self.versions.insert(name.to_string(), version.to_string());
    }

    pub fn object_count(&self) -> usize {
        self.names.len()
    }
}

/// Why a cycle decided to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The set of object names differs from the last published one.
    /// `added` is the first name that was not known before, if any.
    NamesChanged {
        previous: usize,
        current: usize,
        added: Option<String>,
    },
    /// Same names, but an object's version moved.
    ContentChanged {
        name: String,
        previous: Option<String>,
        current: String,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::NamesChanged {
                added: Some(name), ..
            } => write!(f, "object {} added", name),
            Change::NamesChanged {
                previous, current, ..
            } => write!(f, "object count changed ({} -> {})", previous, current),
            Change::ContentChanged {
                name,
                previous,
                current,
            } => write!(
                f,
                "object {} content changed (version {} -> {})",
                name,
                previous.as_deref().unwrap_or("<none>"),
                current
            ),
        }
    }
}

/// Names and versions as of the last successful publish.
///
/// Owned by the `Aggregator` and replaced wholesale after each publish, so
/// objects that disappeared never linger in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatorState {
    last_names: BTreeSet<String>,
    last_versions: BTreeMap<String, String>,
}

impl AggregatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare an observation with the last published state.
    ///
    /// Name changes win over content changes. A name change is a different
    /// object count, or a name that was not known before; with equal counts
    /// the second check also catches a simultaneous add and remove.
    pub fn detect(&self, observed: &Observation) -> Option<Change> {
        if observed.names.len() != self.last_names.len() {
            return Some(Change::NamesChanged {
                previous: self.last_names.len(),
                current: observed.names.len(),
                added: self.first_unknown_name(observed),
            });
        }
        if let Some(added) = self.first_unknown_name(observed) {
            return Some(Change::NamesChanged {
                previous: self.last_names.len(),
                current: observed.names.len(),
                added: Some(added),
            });
        }

        observed
            .versions
            .iter()
            .find(|(name, version)| self.last_versions.get(*name) != Some(*version))
            .map(|(name, version)| Change::ContentChanged {
                name: name.clone(),
                previous: self.last_versions.get(name).cloned(),
                current: version.clone(),
            })
    }

    /// Replace the recorded names and versions with an observation's.
    pub fn record(&mut self, observed: &Observation) {
        self.last_names = observed.names.clone();
        self.last_versions = observed.versions.clone();
    }

    pub fn names(&self) -> &BTreeSet<String> {
        &self.last_names
    }

    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.last_versions.get(name).map(String::as_str)
    }

    fn first_unknown_name(&self, observed: &Observation) -> Option<String> {
        observed
            .names
            .iter()
            .find(|name| !self.last_names.contains(*name))
            .cloned()
    }
}
