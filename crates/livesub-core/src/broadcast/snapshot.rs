//! Last-seen resource versions.

use std::collections::{HashMap, HashSet};

use crate::resource::{ResourceId, ResourceVersion};

/// Versions observed by the previous broadcast cycle.
#[derive(Debug, Default)]
pub struct VersionSnapshot {
    seen: HashMap<ResourceId, u64>,
}

impl VersionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `listing` and return the entries whose version differs from the
    /// one last seen. Resources missing from `listing` are forgotten.
    ///
    /// A resource seen for the first time is compared against
    /// [`ResourceVersion::INITIAL`]: creation alone is not a change, but a
    /// resource already bumped past its initial version is.
    pub fn advance(&mut self, listing: &[ResourceVersion]) -> Vec<ResourceVersion> {
        let mut changed = Vec::new();
        for entry in listing {
            let previous = self
                .seen
                .insert(entry.id.clone(), entry.version)
                .unwrap_or(ResourceVersion::INITIAL);
            if previous != entry.version {
                changed.push(entry.clone());
            }
        }

        if self.seen.len() > listing.len() {
            let present: HashSet<&ResourceId> = listing.iter().map(|entry| &entry.id).collect();
            self.seen.retain(|id, _| present.contains(id));
        }

        changed
    }

    /// Overwrite the recorded version of a resource.
    pub fn record(&mut self, id: &ResourceId, version: u64) {
        self.seen.insert(id.clone(), version);
    }

    /// Forget a resource so its next sighting is treated as a first sighting.
    pub fn forget(&mut self, id: &ResourceId) {
        self.seen.remove(id);
    }

    pub fn version_of(&self, id: &str) -> Option<u64> {
        self.seen.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
