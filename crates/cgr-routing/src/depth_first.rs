//! Exhaustive depth-first route enumeration
//!
//! Walks every loop-free contact sequence from the source, extending a route
//! only with contacts it is eligible for and that are still open when the
//! bundle, leaving the source at the query time, is ready at their sender.
//! The sequences that end at the destination are kept, and the walk stops
//! extending a route once it reaches the destination. Cost grows exponentially
//! with branching, so this is meant for small plans and for cross-checking the
//! other strategies.

use cgr_core::{ContactPlan, NodeId, Route, Time};
use tracing::{debug, trace};

use crate::strategy::{RouteEnumerator, RouteQuery};
use crate::suppression::Suppression;

/// Exhaustive path enumeration, sorted best-first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthFirst;

impl DepthFirst {
    /// `ready` is the arrival at the route's last node
    fn walk(
        plan: &ContactPlan,
        route: Route,
        ready: Time,
        destination: NodeId,
        found: &mut Vec<Route>,
    ) {
        if route.to_node() == destination {
            trace!(route = %route, "Path reaches destination");
            found.push(route);
            return;
        }
        for &next in plan.departing(route.to_node()) {
            let contact = &plan[next];
            if contact.end > ready && route.is_eligible(contact) {
                let arrival = ready.max(contact.start).saturating_add(contact.owlt);
                Self::walk(plan, route.extended(plan, next), arrival, destination, found);
            }
        }
    }
}

impl RouteEnumerator for DepthFirst {
    /// Suppressed contacts are only honoured as first hops
    fn enumerate_with(
        &self,
        plan: &ContactPlan,
        query: &RouteQuery,
        initial: &Suppression,
    ) -> Vec<Route> {
        let reaches_destination = plan.iter().any(|(_, c)| c.to == query.destination);
        if plan.departing(query.source).is_empty() || !reaches_destination {
            return Vec::new();
        }

        let mut found = Vec::new();
        for &first in plan.departing(query.source) {
            let contact = &plan[first];
            if contact.end <= query.current_time || initial.is_suppressed(first) {
                continue;
            }
            let arrival = query
                .current_time
                .max(contact.start)
                .saturating_add(contact.owlt);
            Self::walk(plan, Route::new(plan, first), arrival, query.destination, &mut found);
        }

        found.sort_by(Route::best_first);
        debug!(
            source = query.source,
            destination = query.destination,
            routes = found.len(),
            "Depth-first enumeration complete"
        );
        found
    }

    fn name(&self) -> &'static str {
        "depth-first"
    }
}
