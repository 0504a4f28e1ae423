//! Merging results from one or more passes.
//!
//! The full pass never re-probes a priority port, so a repeated port means a
//! bug upstream; the first result is kept and the repeat is counted.

use crate::scanner::PortResult;
use crate::types::Port;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::warn;

/// Collects pass results keyed by port.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: BTreeMap<Port, PortResult>,
    duplicates: usize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every result from one pass.
    pub fn add_pass(&mut self, pass: impl IntoIterator<Item = PortResult>) {
        for result in pass {
            match self.results.entry(result.port) {
                Entry::Vacant(slot) => {
                    slot.insert(result);
                }
                Entry::Occupied(_) => {
                    warn!(port = %result.port, "port reported twice, keeping first result");
                    self.duplicates += 1;
                }
            }
        }
    }

    /// Number of distinct ports collected.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results dropped because their port was already present.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Number of open ports collected.
    pub fn open_count(&self) -> usize {
        self.results.values().filter(|r| r.is_open()).count()
    }

    /// Ascending, unique results; closed and errored ports only when
    /// `include_closed` is set.
    pub fn finish(self, include_closed: bool) -> Vec<PortResult> {
        self.results
            .into_values()
            .filter(|r| include_closed || r.is_open())
            .collect()
    }
}
