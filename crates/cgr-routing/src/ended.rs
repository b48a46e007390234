//! First-ended enumeration
//!
//! After each route, the hops whose end equals the route's validity bound are
//! suppressed, so the next route is the best one that survives the closing of
//! that window.

use cgr_core::{ContactPlan, Route};
use tracing::debug;

use crate::search::{RouteSearch, SearchOrigin};
use crate::strategy::{RouteEnumerator, RouteQuery};
use crate::suppression::Suppression;

/// Time-oriented route enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndedFirst;

impl RouteEnumerator for EndedFirst {
    fn enumerate_with(
        &self,
        plan: &ContactPlan,
        query: &RouteQuery,
        initial: &Suppression,
    ) -> Vec<Route> {
        let mut search = RouteSearch::new(plan);
        let mut suppression = initial.clone();
        let origin = SearchOrigin::node(query.source, query.current_time);

        let mut routes = Vec::new();
        while let Some(route) = search.find(&origin, query.destination, &suppression) {
            for hop in route.limiting_hops() {
                suppression.suppress(hop.contact);
            }
            debug!(route = %route, to_time = route.to_time(), "Route accepted");
            routes.push(route);
        }
        routes
    }

    fn name(&self) -> &'static str {
        "ended-first"
    }
}
