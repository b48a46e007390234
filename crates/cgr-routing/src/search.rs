//! Earliest-arrival route search over the contact graph
//!
//! Contacts are the vertices of the search graph: contact `b` follows contact
//! `a` when `b` departs the node `a` delivers to. Each contact carries a label
//! with its best known arrival time, and the search is label-setting: the
//! unfinalized contact with the earliest arrival is expanded next, until no
//! open label can beat the best arrival already recorded at the destination.
//!
//! Labels live in a [`RouteSearch`] scratch table indexed by [`ContactId`], so
//! the plan itself is only read. Exclusions that persist across the searches
//! of an enumeration run are passed in as a [`Suppression`].
//!
//! ## Determinism
//!
//! On equal arrival a label keeps its predecessor unless the new one is a
//! lower [`Vertex`] (root first, then by contact id). Among destination
//! contacts with equal arrival the lowest contact id wins.

use cgr_core::{ContactId, ContactPlan, INFINITE_TIME, NodeId, Route, Time};
use tracing::{debug, trace};

use crate::suppression::Suppression;

/// A vertex of the search graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Vertex {
    /// Synthetic origin meaning "at the source node at the query time"
    Root,
    /// A contact of the plan
    Contact(ContactId),
}

/// Where a search starts
#[derive(Debug, Clone)]
pub struct SearchOrigin {
    vertex: Vertex,
    frm: NodeId,
    to: NodeId,
    arrival: Time,
    visited_nodes: Vec<NodeId>,
}

impl SearchOrigin {
    /// Start at `node` at `time`
    pub fn node(node: NodeId, time: Time) -> Self {
        Self {
            vertex: Vertex::Root,
            frm: node,
            to: node,
            arrival: time,
            visited_nodes: vec![node],
        }
    }

    /// Resume from a contact already reached at `arrival`
    ///
    /// `visited_nodes` lists the nodes of the path leading to the contact; they
    /// are excluded from the continuation.
    pub fn contact(
        plan: &ContactPlan,
        id: ContactId,
        arrival: Time,
        visited_nodes: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        let contact = &plan[id];
        let mut visited: Vec<NodeId> = visited_nodes.into_iter().collect();
        if !visited.contains(&contact.to) {
            visited.push(contact.to);
        }
        Self {
            vertex: Vertex::Contact(id),
            frm: contact.frm,
            to: contact.to,
            arrival,
            visited_nodes: visited,
        }
    }
}

/// Per-contact scratch state of one search
#[derive(Debug, Clone)]
struct Label {
    arrival: Time,
    finalized: bool,
    predecessor: Option<Vertex>,
    visited_nodes: Vec<NodeId>,
}

impl Default for Label {
    fn default() -> Self {
        Self {
            arrival: INFINITE_TIME,
            finalized: false,
            predecessor: None,
            visited_nodes: Vec::new(),
        }
    }
}

/// The vertex being expanded
struct Expansion {
    vertex: Vertex,
    frm: NodeId,
    to: NodeId,
    arrival: Time,
    visited_nodes: Vec<NodeId>,
}

/// Why a candidate contact was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    SuppressedNextHop,
    Suppressed,
    Finalized,
    NodeVisited,
    EndsBeforeArrival,
    NoResidualVolume,
    ReturnsToPrevious,
}

/// Reusable earliest-arrival search over one plan
pub struct RouteSearch<'a> {
    plan: &'a ContactPlan,
    labels: Vec<Label>,
}

impl<'a> RouteSearch<'a> {
    pub fn new(plan: &'a ContactPlan) -> Self {
        Self {
            plan,
            labels: vec![Label::default(); plan.len()],
        }
    }

    pub fn plan(&self) -> &'a ContactPlan {
        self.plan
    }

    /// Arrival recorded for a contact by the last search
    pub fn arrival(&self, id: ContactId) -> Time {
        self.labels
            .get(id.index())
            .map_or(INFINITE_TIME, |label| label.arrival)
    }

    /// Find the earliest-arrival route from `origin` to `destination`
    ///
    /// When the origin is a contact, the returned route starts after it.
    /// Returns `None` when the destination cannot be reached under the given
    /// suppression and the plan's residual capacity.
    pub fn find(
        &mut self,
        origin: &SearchOrigin,
        destination: NodeId,
        suppression: &Suppression,
    ) -> Option<Route> {
        self.reset();

        if let Vertex::Contact(id) = origin.vertex {
            let label = &mut self.labels[id.index()];
            label.arrival = origin.arrival;
            label.visited_nodes = origin.visited_nodes.clone();
        }

        let mut current = Expansion {
            vertex: origin.vertex,
            frm: origin.frm,
            to: origin.to,
            arrival: origin.arrival,
            visited_nodes: origin.visited_nodes.clone(),
        };
        let mut best: Option<(ContactId, Time)> = None;

        loop {
            self.relax_successors(&current, destination, suppression, &mut best);

            if let Vertex::Contact(id) = current.vertex {
                self.labels[id.index()].finalized = true;
            }

            let finish_bound = best.map_or(INFINITE_TIME, |(_, arrival)| arrival);
            let Some(next) = self.next_open(finish_bound, suppression) else {
                break;
            };
            let contact = &self.plan[next];
            let label = &self.labels[next.index()];
            current = Expansion {
                vertex: Vertex::Contact(next),
                frm: contact.frm,
                to: contact.to,
                arrival: label.arrival,
                visited_nodes: label.visited_nodes.clone(),
            };
        }

        let (last, arrival) = best?;
        let hops = self.path_to(last, origin.vertex);
        let route = Route::from_hops(self.plan, &hops);
        debug!(
            destination,
            arrival,
            hops = route.len(),
            next_node = route.next_node(),
            "Route found"
        );
        Some(route)
    }

    fn reset(&mut self) {
        self.labels.clear();
        self.labels.resize(self.plan.len(), Label::default());
    }

    fn rejection(
        &self,
        current: &Expansion,
        id: ContactId,
        suppression: &Suppression,
    ) -> Option<Rejection> {
        let contact = &self.plan[id];
        if suppression.is_next_hop_suppressed(current.vertex, id) {
            Some(Rejection::SuppressedNextHop)
        } else if suppression.is_suppressed(id) {
            Some(Rejection::Suppressed)
        } else if self.labels[id.index()].finalized {
            Some(Rejection::Finalized)
        } else if current.visited_nodes.contains(&contact.to) {
            Some(Rejection::NodeVisited)
        } else if contact.end <= current.arrival {
            Some(Rejection::EndsBeforeArrival)
        } else if !contact.has_residual_volume() {
            Some(Rejection::NoResidualVolume)
        } else if current.frm == contact.to && current.to == contact.frm {
            Some(Rejection::ReturnsToPrevious)
        } else {
            None
        }
    }

    fn relax_successors(
        &mut self,
        current: &Expansion,
        destination: NodeId,
        suppression: &Suppression,
        best: &mut Option<(ContactId, Time)>,
    ) {
        let plan = self.plan;
        for &id in plan.departing(current.to) {
            if let Some(reason) = self.rejection(current, id, suppression) {
                trace!(contact = %id, ?reason, "Candidate rejected");
                continue;
            }

            let contact = &plan[id];
            let arrival = current.arrival.max(contact.start).saturating_add(contact.owlt);
            let label = &mut self.labels[id.index()];
            let improves = arrival < label.arrival
                || (arrival == label.arrival
                    && label.predecessor.is_none_or(|previous| current.vertex < previous));
            if !improves {
                trace!(contact = %id, arrival, recorded = label.arrival, "Label kept");
                continue;
            }

            label.arrival = arrival;
            label.predecessor = Some(current.vertex);
            label.visited_nodes = current.visited_nodes.clone();
            label.visited_nodes.push(contact.to);
            trace!(contact = %id, arrival, "Label updated");

            if contact.to == destination {
                let better = best.is_none_or(|(best_id, best_arrival)| {
                    arrival < best_arrival || (arrival == best_arrival && id < best_id)
                });
                if better {
                    *best = Some((id, arrival));
                }
            }
        }
    }

    /// Open contact with the earliest arrival not beyond `finish_bound`
    fn next_open(&self, finish_bound: Time, suppression: &Suppression) -> Option<ContactId> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(index, label)| {
                !label.finalized
                    && label.arrival < INFINITE_TIME
                    && label.arrival <= finish_bound
                    && !suppression.is_suppressed(ContactId(*index))
            })
            .min_by_key(|(_, label)| label.arrival)
            .map(|(index, _)| ContactId(index))
    }

    fn path_to(&self, last: ContactId, origin: Vertex) -> Vec<ContactId> {
        let mut hops = Vec::new();
        let mut vertex = Vertex::Contact(last);
        while vertex != origin {
            let Vertex::Contact(id) = vertex else {
                break;
            };
            hops.push(id);
            match self.labels[id.index()].predecessor {
                Some(previous) => vertex = previous,
                None => break,
            }
        }
        hops.reverse();
        hops
    }
}

/// Earliest-arrival route from `source` at `time`, with nothing suppressed
pub fn earliest_route(
    plan: &ContactPlan,
    source: NodeId,
    destination: NodeId,
    time: Time,
) -> Option<Route> {
    RouteSearch::new(plan).find(
        &SearchOrigin::node(source, time),
        destination,
        &Suppression::new(),
    )
}
