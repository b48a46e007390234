//! Node-level search over the contact multigraph
//!
//! Nodes are the vertices here and every (from, to) pair keeps its contacts
//! ordered by end time. A Dijkstra over nodes picks, for each neighbour, the
//! usable contact that delivers earliest. This trades the loop and next-hop
//! controls of the contact-level search for a much smaller frontier.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use cgr_core::{ContactId, ContactPlan, NodeId, Route, Time};
use tracing::{debug, trace};

use crate::suppression::Suppression;

/// Contacts of a plan grouped by transmitter and receiver
#[derive(Debug, Clone, Default)]
pub struct ContactMultigraph {
    /// node -> neighbour -> contacts sorted by (end, start, id)
    adjacency: HashMap<NodeId, BTreeMap<NodeId, Vec<ContactId>>>,
}

impl ContactMultigraph {
    pub fn new(plan: &ContactPlan) -> Self {
        let mut adjacency: HashMap<NodeId, BTreeMap<NodeId, Vec<ContactId>>> = HashMap::new();
        for (id, contact) in plan.iter() {
            adjacency
                .entry(contact.frm)
                .or_default()
                .entry(contact.to)
                .or_default()
                .push(id);
        }
        for neighbours in adjacency.values_mut() {
            for contacts in neighbours.values_mut() {
                contacts.sort_by_key(|id| (plan[*id].end, plan[*id].start, *id));
            }
        }
        Self { adjacency }
    }

    /// Neighbours reachable from `node` by at least one contact
    pub fn neighbours(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|neighbours| neighbours.keys().copied())
    }

    /// Earliest-arrival route from `source` at `time` to `destination`
    pub fn find(
        &self,
        plan: &ContactPlan,
        source: NodeId,
        destination: NodeId,
        time: Time,
        suppression: &Suppression,
    ) -> Option<Route> {
        let mut arrival: HashMap<NodeId, Time> = HashMap::from([(source, time)]);
        let mut predecessor: HashMap<NodeId, ContactId> = HashMap::new();
        let mut settled: HashSet<NodeId> = HashSet::new();
        let mut frontier = BinaryHeap::from([Reverse((time, source))]);

        let mut reached = false;
        while let Some(Reverse((at, node))) = frontier.pop() {
            if !settled.insert(node) {
                continue;
            }
            if node == destination {
                reached = true;
                break;
            }

            let Some(neighbours) = self.adjacency.get(&node) else {
                continue;
            };
            for (&neighbour, contacts) in neighbours {
                if settled.contains(&neighbour) {
                    continue;
                }
                let Some((id, candidate)) = best_contact(plan, contacts, at, suppression) else {
                    continue;
                };
                let recorded = arrival.get(&neighbour).copied().unwrap_or(Time::MAX);
                if candidate < recorded {
                    trace!(from = node, to = neighbour, contact = %id, arrival = candidate, "Node relaxed");
                    arrival.insert(neighbour, candidate);
                    predecessor.insert(neighbour, id);
                    frontier.push(Reverse((candidate, neighbour)));
                }
            }
        }

        if !reached || source == destination {
            return None;
        }

        let mut hops = Vec::new();
        let mut node = destination;
        while node != source {
            let id = *predecessor.get(&node)?;
            hops.push(id);
            node = plan[id].frm;
        }
        hops.reverse();

        let route = Route::from_hops(plan, &hops);
        debug!(
            destination,
            arrival = arrival.get(&destination).copied().unwrap_or(Time::MAX),
            hops = route.len(),
            next_node = route.next_node(),
            "Multigraph route found"
        );
        Some(route)
    }
}

/// Usable contact with the earliest arrival when ready to send at `ready`
fn best_contact(
    plan: &ContactPlan,
    contacts: &[ContactId],
    ready: Time,
    suppression: &Suppression,
) -> Option<(ContactId, Time)> {
    let open = contacts.partition_point(|id| plan[*id].end <= ready);
    contacts[open..]
        .iter()
        .filter(|id| !suppression.is_suppressed(**id) && plan[**id].has_residual_volume())
        .map(|id| {
            let contact = &plan[*id];
            (*id, ready.max(contact.start).saturating_add(contact.owlt))
        })
        .min_by_key(|(id, arrival)| (*arrival, *id))
}
