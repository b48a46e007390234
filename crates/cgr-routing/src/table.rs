//! Next-hop table shared between the router and its readers
//!
//! The [`NextHopTable`] records the current forwarding decision for every
//! tracked destination. Entries carry the wall-clock time of their last
//! update; an entry not refreshed within the stale timeout should be
//! recomputed.

use std::time::Duration;

use cgr_core::NodeId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// A next-hop decision with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct NextHopEntry {
    /// Neighbour to forward to, `None` when the destination is unreachable
    pub next_hop: Option<NodeId>,
    /// When this entry was inserted/updated
    pub updated_at: DateTime<Utc>,
}

/// Concurrent destination -> next hop map
pub struct NextHopTable {
    entries: DashMap<NodeId, NextHopEntry>,
    /// Duration after which entries are considered stale
    stale_timeout: Duration,
}

impl NextHopTable {
    /// Create a table with the given stale timeout
    pub fn new(stale_timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            stale_timeout,
        }
    }

    /// Record the next hop for a destination, returning the previous one
    ///
    /// The outer `Option` is `None` when the destination was not tracked.
    pub fn insert(&self, destination: NodeId, next_hop: Option<NodeId>) -> Option<Option<NodeId>> {
        let entry = NextHopEntry {
            next_hop,
            updated_at: Utc::now(),
        };
        self.entries
            .insert(destination, entry)
            .map(|previous| previous.next_hop)
    }

    /// Full entry for a destination
    pub fn get(&self, destination: NodeId) -> Option<NextHopEntry> {
        self.entries.get(&destination).map(|entry| entry.clone())
    }

    /// Next hop for a destination, `None` if unknown or unreachable
    pub fn next_hop(&self, destination: NodeId) -> Option<NodeId> {
        self.entries
            .get(&destination)
            .and_then(|entry| entry.next_hop)
    }

    /// Stop tracking a destination
    pub fn remove(&self, destination: NodeId) {
        self.entries.remove(&destination);
    }

    /// Check if the entry for a destination is stale
    ///
    /// Unknown destinations are stale.
    pub fn is_stale(&self, destination: NodeId) -> bool {
        match self.entries.get(&destination) {
            None => true,
            Some(entry) => {
                let age = Utc::now() - entry.updated_at;
                age > self.stale_duration()
            }
        }
    }

    /// Drop every stale entry
    pub fn prune_stale(&self) {
        let stale_duration = self.stale_duration();
        let now = Utc::now();
        self.entries
            .retain(|_, entry| now - entry.updated_at <= stale_duration);
    }

    /// Refresh the timestamp of an entry without changing it
    pub fn confirm(&self, destination: NodeId) {
        if let Some(mut entry) = self.entries.get_mut(&destination) {
            entry.updated_at = Utc::now();
        }
    }

    /// Tracked destinations, in ascending order
    pub fn destinations(&self) -> Vec<NodeId> {
        let mut destinations: Vec<NodeId> = self.entries.iter().map(|entry| *entry.key()).collect();
        destinations.sort_unstable();
        destinations
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn stale_duration(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.stale_timeout).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for NextHopTable {
    fn default() -> Self {
        // Default 5 minute stale timeout
        Self::new(Duration::from_secs(300))
    }
}
