//! Route enumeration strategies
//!
//! Every strategy produces a route list for one (source, destination, time)
//! query. All but [`DepthFirst`](crate::DepthFirst) run the earliest-arrival
//! search repeatedly, changing which contacts are suppressed between runs.
//! Suppression state is private to one call of
//! [`RouteEnumerator::enumerate`], so runs never influence each other.

use serde::{Deserialize, Serialize};

use cgr_core::{ContactPlan, NodeId, Route, Time};

use crate::anchor::AnchorSearch;
use crate::depleted::DepletedFirst;
use crate::depth_first::DepthFirst;
use crate::ended::EndedFirst;
use crate::kbest::KBest;
use crate::suppression::Suppression;

/// Default number of routes for k-best enumeration
pub const DEFAULT_ROUTE_COUNT: usize = 10;

/// A route list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteQuery {
    pub source: NodeId,
    pub destination: NodeId,
    pub current_time: Time,
}

impl RouteQuery {
    pub fn new(source: NodeId, destination: NodeId, current_time: Time) -> Self {
        Self {
            source,
            destination,
            current_time,
        }
    }
}

/// Produces a list of routes for a query
pub trait RouteEnumerator: Send + Sync {
    /// Enumerate routes with `initial` hidden from every search of the run
    ///
    /// Routes come out in the order the strategy discovers or ranks them.
    fn enumerate_with(
        &self,
        plan: &ContactPlan,
        query: &RouteQuery,
        initial: &Suppression,
    ) -> Vec<Route>;

    /// Enumerate routes over the whole plan
    fn enumerate(&self, plan: &ContactPlan, query: &RouteQuery) -> Vec<Route> {
        self.enumerate_with(plan, query, &Suppression::new())
    }

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Which enumeration strategy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Yen-style k shortest routes
    ///
    /// Ranked best-first with no duplicate hop sequences.
    KBest { k: usize },

    /// Anchor search with limiting-contact suppression
    ///
    /// Routes come out in the order older CGR implementations produced them.
    Anchor,

    /// Exhaustive walk of every loop-free path
    ///
    /// Exponential in the plan's branching factor; for small plans only.
    DepthFirst,

    /// Repeated search suppressing hops whose capacity the previous routes used up
    DepletedFirst,

    /// Repeated search suppressing the hop that closes each route's window
    EndedFirst,
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::KBest {
            k: DEFAULT_ROUTE_COUNT,
        }
    }
}

impl StrategyKind {
    /// Build the enumerator for this strategy
    pub fn enumerator(&self) -> Box<dyn RouteEnumerator> {
        match *self {
            StrategyKind::KBest { k } => Box::new(KBest::new(k)),
            StrategyKind::Anchor => Box::new(AnchorSearch),
            StrategyKind::DepthFirst => Box::new(DepthFirst),
            StrategyKind::DepletedFirst => Box::new(DepletedFirst),
            StrategyKind::EndedFirst => Box::new(EndedFirst),
        }
    }

    /// Whether the strategy output is sorted best-first
    pub fn is_ranked(&self) -> bool {
        matches!(self, StrategyKind::KBest { .. } | StrategyKind::DepthFirst)
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::KBest { k } => write!(f, "k-best(k={k})"),
            StrategyKind::Anchor => write!(f, "anchor"),
            StrategyKind::DepthFirst => write!(f, "depth-first"),
            StrategyKind::DepletedFirst => write!(f, "depleted-first"),
            StrategyKind::EndedFirst => write!(f, "ended-first"),
        }
    }
}
