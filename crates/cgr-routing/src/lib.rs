//! # CGR Routing
//!
//! Contact graph routing for delay-tolerant networks.
//!
//! Routes are computed over a [`ContactPlan`](cgr_core::ContactPlan): a
//! schedule of future, time-bounded, capacity-limited contacts between
//! nodes. The crate provides the single-route search, several ways of
//! enumerating route lists, and the admissibility check that turns a route
//! list into forwarding candidates for one bundle.
//!
//! ## Core Components
//!
//! - [`RouteSearch`]: earliest-arrival search over contacts
//! - [`ContactMultigraph`]: earliest-arrival search over nodes
//! - [`RouteEnumerator`]: route list strategies ([`KBest`], [`AnchorSearch`],
//!   [`DepthFirst`], [`DepletedFirst`], [`EndedFirst`])
//! - [`ForwardingSelector`]: per-bundle route filtering and ranking
//! - [`ContactGraphRouter`]: owns a plan and keeps a [`NextHopTable`] current
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashSet;
//! use cgr_core::{Bundle, Contact, ContactPlan};
//! use cgr_routing::{CgrConfig, ContactGraphRouter};
//!
//! let plan = ContactPlan::from_contacts([
//!     Contact::new(1, 2, 0, 100, 10).with_owlt(1),
//!     Contact::new(2, 3, 10, 100, 10).with_owlt(1),
//! ])?;
//! let mut router = ContactGraphRouter::try_new(plan, CgrConfig::default(), 1)?;
//!
//! let route = router.compute_optimal_route(3, 0).expect("reachable");
//! assert_eq!(route.next_node(), 2);
//!
//! let bundle = Bundle::new(1, 3, 50, 100);
//! let chosen = router.forward(&bundle, 0, &mut HashSet::new())?;
//! assert!(chosen.is_some());
//! # Ok::<(), cgr_routing::RoutingError>(())
//! ```

pub mod anchor;
pub mod depleted;
pub mod depth_first;
pub mod ended;
pub mod error;
pub mod forwarding;
pub mod kbest;
pub mod multigraph;
pub mod router;
pub mod search;
pub mod strategy;
pub mod suppression;
pub mod table;

// Re-export main types
pub use anchor::AnchorSearch;
pub use depleted::DepletedFirst;
pub use depth_first::DepthFirst;
pub use ended::EndedFirst;
pub use error::{RoutingError, RoutingResult};
pub use forwarding::{CandidateRoute, Exclusion, ForwardingConfig, ForwardingSelector, HopTiming};
pub use kbest::KBest;
pub use multigraph::ContactMultigraph;
pub use router::{ContactGraphRouter, RouteUpdate};
pub use search::{RouteSearch, SearchOrigin, Vertex, earliest_route};
pub use strategy::{DEFAULT_ROUTE_COUNT, RouteEnumerator, RouteQuery, StrategyKind};
pub use suppression::Suppression;
pub use table::{NextHopEntry, NextHopTable};

use serde::{Deserialize, Serialize};

/// Route counts above this are flagged
pub const LARGE_ROUTE_COUNT: usize = 1000;

/// Single-route search used for next-hop decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchAlgorithm {
    /// Label-setting search over contacts
    #[default]
    ContactGraph,
    /// Dijkstra over nodes of the contact multigraph
    Multigraph,
}

/// Configuration for the routing engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgrConfig {
    /// Search behind `compute_optimal_route`
    pub search: SearchAlgorithm,
    /// Strategy behind route lists
    pub strategy: StrategyKind,
    /// Forwarding policy
    pub forwarding: ForwardingConfig,
}

impl CgrConfig {
    /// Enumerate every loop-free path
    ///
    /// Only practical for small plans.
    pub fn exhaustive() -> Self {
        Self {
            strategy: StrategyKind::DepthFirst,
            ..Self::default()
        }
    }

    /// Route lists that spread load across contact capacity
    pub fn capacity_aware() -> Self {
        Self {
            strategy: StrategyKind::DepletedFirst,
            ..Self::default()
        }
    }

    /// Anchor search, matching the route order of older CGR implementations
    pub fn legacy() -> Self {
        Self {
            strategy: StrategyKind::Anchor,
            ..Self::default()
        }
    }

    /// Node-level search and short route lists
    pub fn low_latency() -> Self {
        Self {
            search: SearchAlgorithm::Multigraph,
            strategy: StrategyKind::KBest { k: 3 },
            forwarding: ForwardingConfig::default(),
        }
    }

    /// Set the enumeration strategy
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the single-route search
    pub fn with_search(mut self, search: SearchAlgorithm) -> Self {
        self.search = search;
        self
    }

    /// Allow forwarding back to the bundle sender
    pub fn with_return_to_sender(mut self, enabled: bool) -> Self {
        self.forwarding.return_to_sender = enabled;
        self
    }

    /// Validate configuration invariants
    ///
    /// Returns a list of warnings/errors if the configuration has potential issues.
    /// An empty list means the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if let StrategyKind::KBest { k } = self.strategy {
            if k == 0 {
                warnings.push(ConfigWarning::ZeroRouteCount);
            } else if k > LARGE_ROUTE_COUNT {
                warnings.push(ConfigWarning::LargeRouteCount);
            }
        }

        if self.strategy == StrategyKind::DepthFirst {
            warnings.push(ConfigWarning::ExhaustiveSearch);
        }

        warnings
    }

    /// Check if the configuration is valid (no errors)
    pub fn is_valid(&self) -> bool {
        !self.validate().iter().any(ConfigWarning::is_error)
    }
}

/// Configuration warnings and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// K-best strategy asks for zero routes
    ZeroRouteCount,
    /// K-best route count is very large (> 1000)
    LargeRouteCount,
    /// Depth-first enumeration is exponential in plan size
    ExhaustiveSearch,
}

impl ConfigWarning {
    /// Whether the warning makes the configuration unusable
    pub fn is_error(&self) -> bool {
        matches!(self, ConfigWarning::ZeroRouteCount)
    }
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::ZeroRouteCount => write!(f, "k-best route count is zero"),
            ConfigWarning::LargeRouteCount => {
                write!(f, "k-best route count is very large (> {LARGE_ROUTE_COUNT})")
            }
            ConfigWarning::ExhaustiveSearch => {
                write!(f, "depth-first enumeration is exponential in plan size")
            }
        }
    }
}
