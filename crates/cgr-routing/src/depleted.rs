//! First-depleted enumeration
//!
//! Every route found is assumed to carry its full volume. That volume is
//! charged against the remaining limit of each hop, and hops with nothing
//! left are suppressed before the next search. The bottleneck hop is always
//! exhausted, so every iteration suppresses at least one contact.

use std::collections::HashMap;

use cgr_core::{ContactId, ContactPlan, Route, Volume};
use tracing::debug;

use crate::search::{RouteSearch, SearchOrigin};
use crate::strategy::{RouteEnumerator, RouteQuery};
use crate::suppression::Suppression;

/// Capacity-oriented route enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepletedFirst;

impl RouteEnumerator for DepletedFirst {
    fn enumerate_with(
        &self,
        plan: &ContactPlan,
        query: &RouteQuery,
        initial: &Suppression,
    ) -> Vec<Route> {
        let mut search = RouteSearch::new(plan);
        let mut suppression = initial.clone();
        let origin = SearchOrigin::node(query.source, query.current_time);

        let mut remaining: HashMap<ContactId, Volume> = HashMap::new();
        let mut routes = Vec::new();

        while let Some(route) = search.find(&origin, query.destination, &suppression) {
            for hop in route.hops() {
                let limit = remaining
                    .get(&hop.contact)
                    .map_or(hop.effective_volume_limit, |left| {
                        (*left).min(hop.effective_volume_limit)
                    });
                let left = limit.saturating_sub(route.volume());
                remaining.insert(hop.contact, left);
                if left <= 0 {
                    suppression.suppress(hop.contact);
                }
            }
            debug!(
                route = %route,
                suppressed = suppression.suppressed_count(),
                "Route accepted"
            );
            routes.push(route);
        }

        routes
    }

    fn name(&self) -> &'static str {
        "depleted-first"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgr_core::Contact;

    fn ids(route: &Route) -> Vec<usize> {
        route.contact_ids().map(|id| id.index()).collect()
    }

    #[test]
    fn test_shared_first_hop_is_reused_until_depleted() {
        // the wide first hop can carry both narrow second hops
        let plan = ContactPlan::from_contacts([
            Contact::new(1, 2, 0, 100, 10),
            Contact::new(2, 3, 0, 10, 1),
            Contact::new(2, 3, 0, 20, 1),
        ])
        .unwrap();
        let routes = DepletedFirst.enumerate(&plan, &RouteQuery::new(1, 3, 0));
        let paths: Vec<Vec<usize>> = routes.iter().map(ids).collect();
        assert_eq!(paths, vec![vec![0, 1], vec![0, 2]]);
        assert_eq!(routes[0].volume(), 10);
        assert_eq!(routes[1].volume(), 20);
    }

    #[test]
    fn test_bottleneck_first_hop_stops_enumeration() {
        let plan = ContactPlan::from_contacts([
            Contact::new(1, 2, 0, 10, 1),
            Contact::new(2, 3, 0, 100, 10),
            Contact::new(2, 3, 0, 100, 10),
        ])
        .unwrap();
        let routes = DepletedFirst.enumerate(&plan, &RouteQuery::new(1, 3, 0));
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].volume(), 10);
    }
}
