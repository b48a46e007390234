//! K best routes by spur-path deviation (Yen's algorithm on the contact graph)
//!
//! Starting from the earliest-arrival route, each iteration deviates from the
//! most recently accepted route at every one of its vertices (the "spur").
//! The prefix up to the spur is kept fixed, the prefix contacts are
//! suppressed, and the first hops already taken after that prefix by accepted
//! routes are suppressed as successors of the spur. The best deviation not yet
//! seen is accepted next.

use cgr_core::{ContactId, ContactPlan, NodeId, Route, Time};
use tracing::{debug, trace};

use crate::search::{RouteSearch, SearchOrigin, Vertex};
use crate::strategy::{RouteEnumerator, RouteQuery};
use crate::suppression::Suppression;

/// Yen-style k shortest routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KBest {
    k: usize,
}

impl KBest {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Best route deviating from `base` right after its first `spur` hops
    fn spur_route(
        &self,
        search: &mut RouteSearch<'_>,
        query: &RouteQuery,
        base: &[ContactId],
        spur: usize,
        accepted: &[Route],
        initial: &Suppression,
    ) -> Option<Route> {
        let plan = search.plan();
        let prefix = &base[..spur];
        let spur_vertex = match prefix.last() {
            Some(id) => Vertex::Contact(*id),
            None => Vertex::Root,
        };

        let mut suppression = initial.clone();
        if let Some((_, fixed)) = prefix.split_last() {
            for id in fixed {
                suppression.suppress(*id);
            }
        }
        for route in accepted {
            let hops: Vec<ContactId> = route.contact_ids().collect();
            if hops.len() > spur && hops[..spur] == *prefix {
                suppression.suppress_next_hop(spur_vertex, hops[spur]);
            }
        }

        let origin = match spur_vertex {
            Vertex::Root => SearchOrigin::node(query.source, query.current_time),
            Vertex::Contact(spur_contact) => {
                let arrival = prefix_arrival(plan, prefix, query.current_time);
                let visited: Vec<NodeId> = std::iter::once(query.source)
                    .chain(prefix.iter().map(|id| plan[*id].to))
                    .collect();
                SearchOrigin::contact(plan, spur_contact, arrival, visited)
            }
        };

        let tail = search.find(&origin, query.destination, &suppression)?;
        let hops: Vec<ContactId> = prefix.iter().copied().chain(tail.contact_ids()).collect();
        Some(Route::from_hops(plan, &hops))
    }
}

/// Arrival at the end of `prefix` when leaving at `time`
fn prefix_arrival(plan: &ContactPlan, prefix: &[ContactId], time: Time) -> Time {
    prefix.iter().fold(time, |arrival, id| {
        let contact = &plan[*id];
        arrival.max(contact.start).saturating_add(contact.owlt)
    })
}

impl RouteEnumerator for KBest {
    fn enumerate_with(
        &self,
        plan: &ContactPlan,
        query: &RouteQuery,
        initial: &Suppression,
    ) -> Vec<Route> {
        if self.k == 0 {
            return Vec::new();
        }

        let mut search = RouteSearch::new(plan);
        let origin = SearchOrigin::node(query.source, query.current_time);
        let Some(first) = search.find(&origin, query.destination, initial) else {
            return Vec::new();
        };
        debug!(rank = 0, route = %first, "Route accepted");

        let mut accepted = vec![first];
        let mut pending: Vec<Route> = Vec::new();

        while accepted.len() < self.k {
            let base: Vec<ContactId> = accepted[accepted.len() - 1].contact_ids().collect();
            for spur in 0..base.len() {
                let Some(candidate) =
                    self.spur_route(&mut search, query, &base, spur, &accepted, initial)
                else {
                    continue;
                };
                let seen = accepted
                    .iter()
                    .chain(pending.iter())
                    .any(|route| route.same_hops(&candidate));
                if seen {
                    trace!(spur, route = %candidate, "Duplicate candidate dropped");
                } else {
                    trace!(spur, route = %candidate, "Candidate added");
                    pending.push(candidate);
                }
            }

            if pending.is_empty() {
                break;
            }
            pending.sort_by(Route::best_first);
            let next = pending.remove(0);
            debug!(rank = accepted.len(), route = %next, "Route accepted");
            accepted.push(next);
        }

        accepted.sort_by(Route::best_first);
        accepted
    }

    fn name(&self) -> &'static str {
        "k-best"
    }
}
