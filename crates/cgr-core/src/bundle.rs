//! Bundle descriptor used as a routing request
//!
//! Only the fields routing decisions depend on are carried: endpoints, size,
//! deadline, priority and the forwarding flags.

use serde::{Deserialize, Serialize};

use crate::contact::{NodeId, Priority, Time, Volume};

/// Multiplier applied to the payload size to account for encapsulation overhead
pub const EVC_OVERHEAD_FACTOR: f64 = 1.03;

/// Smallest volume any bundle is assumed to consume
pub const EVC_FLOOR: f64 = 100.0;

/// A bundle to be routed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Source node
    pub src: NodeId,
    /// Destination node
    pub dst: NodeId,
    /// Payload size
    pub size: Volume,
    /// Latest acceptable delivery time
    pub deadline: Time,
    /// Priority tier
    pub priority: Priority,
    /// Critical bundles are forwarded on every candidate route
    pub critical: bool,
    /// Custody transfer requested
    pub custody: bool,
    /// Whether the bundle may be fragmented
    pub fragment: bool,
    /// Node the bundle was received from, if any
    pub sender: Option<NodeId>,
}

impl Bundle {
    /// Create a normal-priority, fragmentable bundle
    pub fn new(src: NodeId, dst: NodeId, size: Volume, deadline: Time) -> Self {
        Self {
            src,
            dst,
            size,
            deadline,
            priority: Priority::Normal,
            critical: false,
            custody: false,
            fragment: true,
            sender: None,
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Record the node the bundle was received from
    pub fn with_sender(mut self, sender: NodeId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Mark the bundle as critical
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Request custody transfer
    pub fn with_custody(mut self) -> Self {
        self.custody = true;
        self
    }

    /// Forbid fragmentation
    pub fn without_fragmentation(mut self) -> Self {
        self.fragment = false;
        self
    }

    /// Estimated volume consumption
    pub fn evc(&self) -> f64 {
        (self.size as f64 * EVC_OVERHEAD_FACTOR).max(EVC_FLOOR)
    }

    /// Estimated volume consumption rounded up to whole volume units
    pub fn evc_volume(&self) -> Volume {
        self.evc().ceil() as Volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_defaults() {
        let bundle = Bundle::new(1, 5, 1000, 500);
        assert_eq!(bundle.priority, Priority::Normal);
        assert!(bundle.fragment);
        assert!(!bundle.critical);
        assert!(!bundle.custody);
        assert_eq!(bundle.sender, None);
    }

    #[test]
    fn test_bundle_builder() {
        let bundle = Bundle::new(1, 5, 1000, 500)
            .with_priority(Priority::Expedited)
            .with_sender(3)
            .critical()
            .with_custody()
            .without_fragmentation();
        assert_eq!(bundle.priority, Priority::Expedited);
        assert_eq!(bundle.sender, Some(3));
        assert!(bundle.critical);
        assert!(bundle.custody);
        assert!(!bundle.fragment);
    }

    #[test]
    fn test_evc() {
        let large = Bundle::new(1, 2, 1000, 10);
        assert!((large.evc() - 1030.0).abs() < 1e-9);
        assert_eq!(large.evc_volume(), 1030);

        let small = Bundle::new(1, 2, 10, 10);
        assert_eq!(small.evc(), EVC_FLOOR);
        assert_eq!(small.evc_volume(), 100);

        let odd = Bundle::new(1, 2, 101, 10);
        assert_eq!(odd.evc_volume(), 105);
    }
}
