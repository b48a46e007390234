//! Forwarding admissibility for one bundle
//!
//! Given a route list, [`ForwardingSelector::select`] keeps the routes a
//! bundle may actually be forwarded on. Each route is checked in order
//! against the following clauses, and the first one that fails rejects it:
//!
//! 1. **Sender loop**: the next hop is the node the bundle came from. The
//!    node is added to the excluded set unless return-to-sender is enabled.
//! 2. **Deadline**: best delivery time is past the bundle deadline.
//! 3. **Excluded node**: the next hop is in the excluded set.
//! 4. **Self transit**: some hop delivers back to the current node.
//! 5. **Earliest transmission opportunity**: queued backlog not drained by
//!    earlier contacts to the same neighbour delays the first byte past the
//!    end of the first hop.
//! 6. **Projected arrival**: propagating the bundle's actual transmission
//!    time hop by hop, it arrives after its deadline.
//! 7. **Priority capacity**: the route has no volume left in the bundle's
//!    priority tier.
//! 8. **Fragmentation**: the bundle may not be fragmented and does not fit.
//!
//! Survivors are ranked best-first. Selection never changes plan capacity.

use std::collections::{HashMap, HashSet};

use cgr_core::{Bundle, ContactId, ContactPlan, NodeId, Route, Time, Volume};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Forwarding policy switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingConfig {
    /// Allow forwarding a bundle back to the node it was received from
    pub return_to_sender: bool,
}

/// Projected timing of a bundle over one hop
#[derive(Debug, Clone, PartialEq)]
pub struct HopTiming {
    pub contact: ContactId,
    pub first_byte_tx_time: f64,
    pub last_byte_tx_time: f64,
    pub last_byte_arr_time: f64,
    /// Volume the hop can carry in the bundle's priority tier
    pub effective_volume_limit: f64,
}

/// A route admitted for a bundle, with its bundle-specific projections
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRoute {
    pub route: Route,
    /// Earliest time the first byte can leave
    pub earliest_transmission: f64,
    /// Arrival of the last byte at the destination
    pub projected_arrival: f64,
    /// Smallest hop volume limit in the bundle's priority tier
    pub volume_limit: f64,
    pub hops: Vec<HopTiming>,
}

impl CandidateRoute {
    pub fn next_node(&self) -> NodeId {
        self.route.next_node()
    }
}

/// Why a route was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    NextHopIsSender,
    PastDeadline,
    ExcludedNode,
    TransitsCurrentNode,
    NoTransmissionOpportunity,
    LateProjectedArrival,
    DepletedForPriority,
    CannotFragment,
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exclusion::NextHopIsSender => write!(f, "next hop is the bundle sender"),
            Exclusion::PastDeadline => write!(f, "best delivery time is past the deadline"),
            Exclusion::ExcludedNode => write!(f, "next hop is excluded"),
            Exclusion::TransitsCurrentNode => write!(f, "route transits the current node"),
            Exclusion::NoTransmissionOpportunity => {
                write!(f, "earliest transmission is after the first contact ends")
            }
            Exclusion::LateProjectedArrival => {
                write!(f, "projected arrival is past the deadline")
            }
            Exclusion::DepletedForPriority => write!(f, "route is depleted for the priority"),
            Exclusion::CannotFragment => {
                write!(f, "bundle does not fit and may not be fragmented")
            }
        }
    }
}

/// Filters and ranks routes for a bundle
#[derive(Debug, Clone, Default)]
pub struct ForwardingSelector {
    config: ForwardingConfig,
    /// Volume already queued per neighbour at or above the bundle's priority
    backlog: HashMap<NodeId, Volume>,
}

impl ForwardingSelector {
    pub fn new(config: ForwardingConfig) -> Self {
        Self {
            config,
            backlog: HashMap::new(),
        }
    }

    /// Declare the volume already queued for `next_hop`
    pub fn with_backlog(mut self, next_hop: NodeId, volume: Volume) -> Self {
        self.backlog.insert(next_hop, volume);
        self
    }

    pub fn config(&self) -> &ForwardingConfig {
        &self.config
    }

    /// Queued volume declared for a neighbour
    pub fn backlog(&self, next_hop: NodeId) -> Volume {
        self.backlog.get(&next_hop).copied().unwrap_or(0)
    }

    /// Admissible routes for `bundle` at `current_node`, best-first
    ///
    /// Routes whose next hop is the bundle's sender add that node to
    /// `excluded` as a side effect.
    pub fn select(
        &self,
        current_time: Time,
        current_node: NodeId,
        plan: &ContactPlan,
        bundle: &Bundle,
        routes: &[Route],
        excluded: &mut HashSet<NodeId>,
    ) -> Vec<CandidateRoute> {
        let mut candidates = Vec::new();
        for route in routes {
            match self.evaluate(current_time, current_node, plan, bundle, route, excluded) {
                Ok(candidate) => {
                    debug!(
                        next_node = route.next_node(),
                        projected_arrival = candidate.projected_arrival,
                        volume_limit = candidate.volume_limit,
                        "Route admitted"
                    );
                    candidates.push(candidate);
                }
                Err(reason) => {
                    debug!(next_node = route.next_node(), %reason, "Route excluded");
                }
            }
        }
        candidates.sort_by(|a, b| Route::best_first(&a.route, &b.route));
        candidates
    }

    fn evaluate(
        &self,
        current_time: Time,
        current_node: NodeId,
        plan: &ContactPlan,
        bundle: &Bundle,
        route: &Route,
        excluded: &mut HashSet<NodeId>,
    ) -> Result<CandidateRoute, Exclusion> {
        let next_node = route.next_node();

        if !self.config.return_to_sender && bundle.sender == Some(next_node) {
            excluded.insert(next_node);
            return Err(Exclusion::NextHopIsSender);
        }
        if route.best_delivery_time() > bundle.deadline {
            return Err(Exclusion::PastDeadline);
        }
        if excluded.contains(&next_node) {
            return Err(Exclusion::ExcludedNode);
        }
        if route.hops().iter().any(|hop| hop.to == current_node) {
            return Err(Exclusion::TransitsCurrentNode);
        }

        let earliest_transmission = self.earliest_transmission(current_time, plan, route);
        if earliest_transmission > route.first_hop().end as f64 {
            return Err(Exclusion::NoTransmissionOpportunity);
        }

        let mut hops = project_hops(route, bundle, earliest_transmission);
        let projected_arrival = hops
            .last()
            .map_or(earliest_transmission, |hop| hop.last_byte_arr_time);
        if projected_arrival > bundle.deadline as f64 {
            return Err(Exclusion::LateProjectedArrival);
        }

        let volume_limit = apply_volume_limits(route, plan, bundle, &mut hops);
        if volume_limit <= 0.0 {
            return Err(Exclusion::DepletedForPriority);
        }
        if !bundle.fragment && volume_limit < bundle.evc() {
            return Err(Exclusion::CannotFragment);
        }

        Ok(CandidateRoute {
            route: route.clone(),
            earliest_transmission,
            projected_arrival,
            volume_limit,
            hops,
        })
    }

    /// First-byte time after draining the neighbour backlog
    ///
    /// Earlier contacts to the same neighbour that are still open drain the
    /// backlog before the first hop starts.
    fn earliest_transmission(&self, current_time: Time, plan: &ContactPlan, route: &Route) -> f64 {
        let first = route.first_hop();
        let adjusted_start = current_time.max(first.start);

        let relief: Volume = plan
            .departing(first.frm)
            .iter()
            .map(|id| &plan[*id])
            .filter(|contact| {
                contact.to == first.to && contact.end > current_time && contact.start < first.start
            })
            .map(|contact| {
                contact
                    .end
                    .saturating_sub(current_time.max(contact.start))
                    .saturating_mul(contact.rate)
            })
            .fold(0, Volume::saturating_add);

        let residual = self.backlog(first.to).saturating_sub(relief).max(0);
        adjusted_start as f64 + residual as f64 / first.rate as f64
    }
}

/// First/last byte timings for the bundle's full size
fn project_hops(route: &Route, bundle: &Bundle, earliest_transmission: f64) -> Vec<HopTiming> {
    let mut previous_arrival = 0.0_f64;
    route
        .hops()
        .iter()
        .enumerate()
        .map(|(index, hop)| {
            let first_byte_tx_time = if index == 0 {
                earliest_transmission
            } else {
                (hop.start as f64).max(previous_arrival)
            };
            let last_byte_tx_time = first_byte_tx_time + bundle.size as f64 / hop.rate as f64;
            let last_byte_arr_time = last_byte_tx_time + hop.owlt as f64;
            previous_arrival = last_byte_arr_time;
            HopTiming {
                contact: hop.contact,
                first_byte_tx_time,
                last_byte_tx_time,
                last_byte_arr_time,
                effective_volume_limit: 0.0,
            }
        })
        .collect()
}

/// Fill in per-hop volume limits for the bundle's tier and return the smallest
fn apply_volume_limits(
    route: &Route,
    plan: &ContactPlan,
    bundle: &Bundle,
    timings: &mut [HopTiming],
) -> f64 {
    let route_hops = route.hops();
    let mut limit = f64::INFINITY;
    for (index, timing) in timings.iter_mut().enumerate() {
        let hop = &route_hops[index];
        let stop = route_hops[index..]
            .iter()
            .map(|successor| successor.end)
            .min()
            .unwrap_or(hop.end);
        let duration = stop as f64 - timing.first_byte_tx_time;
        let available = plan
            .get(hop.contact)
            .map_or(0, |contact| contact.mav(bundle.priority));
        timing.effective_volume_limit = (duration * hop.rate as f64).min(available as f64);
        limit = limit.min(timing.effective_volume_limit);
    }
    limit
}
