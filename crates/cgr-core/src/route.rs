//! Routes - loop-free contact sequences with aggregate delivery metrics
//!
//! A [`Route`] stores a snapshot of each hop's schedule next to its
//! [`ContactId`], so metrics can be read without the plan. Metrics are
//! recomputed after every append:
//!
//! - `best_delivery_time`: each hop delivers at `max(prev, start + owlt)` where
//!   `prev` is the previous hop's delivery time plus this hop's light time
//! - `volume`: the smallest effective volume limit over the hops, where a hop's
//!   limit is bounded by the earliest end among itself and every later hop
//! - `confidence`: product of the hop confidences

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::contact::{Contact, ContactId, INFINITE_TIME, NodeId, Time, Volume};
use crate::plan::ContactPlan;

/// One hop of a route, with the contact schedule captured at append time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteHop {
    pub contact: ContactId,
    pub frm: NodeId,
    pub to: NodeId,
    pub start: Time,
    pub end: Time,
    pub rate: Volume,
    pub owlt: Time,
    pub confidence: f64,
    /// Full volume of the underlying contact
    pub volume: Volume,
    /// First byte leaves the transmitter (zero-size transmission model)
    pub first_byte_tx_time: Time,
    /// Last byte reaches the receiver (zero-size transmission model)
    pub last_byte_arr_time: Time,
    /// Volume this hop can carry for the route
    pub effective_volume_limit: Volume,
}

impl RouteHop {
    fn snapshot(id: ContactId, contact: &Contact) -> Self {
        Self {
            contact: id,
            frm: contact.frm,
            to: contact.to,
            start: contact.start,
            end: contact.end,
            rate: contact.rate,
            owlt: contact.owlt,
            confidence: contact.confidence,
            volume: contact.volume(),
            first_byte_tx_time: 0,
            last_byte_arr_time: 0,
            effective_volume_limit: 0,
        }
    }

    /// Arrival at `to` when the bundle is ready to leave `frm` at `ready`
    pub fn arrival_from(&self, ready: Time) -> Time {
        ready.max(self.start).saturating_add(self.owlt)
    }
}

impl fmt::Display for RouteHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}({}-", self.frm, self.to, self.start)?;
        if self.end == INFINITE_TIME {
            write!(f, "inf")?;
        } else {
            write!(f, "{}", self.end)?;
        }
        write!(f, ",d{})", self.owlt)
    }
}

/// A loop-free ordered path of contacts from a source towards `to_node`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    hops: Vec<RouteHop>,
    to_node: NodeId,
    next_node: NodeId,
    from_time: Time,
    to_time: Time,
    best_delivery_time: Time,
    volume: Volume,
    confidence: f64,
}

impl Route {
    /// Start a route at one contact
    ///
    /// # Panics
    ///
    /// Panics if `first` is not a contact of `plan`.
    pub fn new(plan: &ContactPlan, first: ContactId) -> Self {
        let mut route = Self {
            hops: vec![RouteHop::snapshot(first, &plan[first])],
            to_node: 0,
            next_node: 0,
            from_time: 0,
            to_time: 0,
            best_delivery_time: 0,
            volume: 0,
            confidence: 1.0,
        };
        route.refresh_metrics();
        route
    }

    /// Build a route from a contiguous hop sequence
    ///
    /// # Panics
    ///
    /// Panics if `hops` is empty or any hop fails [`Route::is_eligible`].
    pub fn from_hops(plan: &ContactPlan, hops: &[ContactId]) -> Self {
        assert!(!hops.is_empty(), "a route needs at least one hop");
        let mut route = Self::new(plan, hops[0]);
        for id in &hops[1..] {
            route.append(plan, *id);
        }
        route
    }

    /// Whether `contact` can extend this route
    ///
    /// The contact must lead to a node not yet on the route and must still be
    /// open when the last hop's first byte arrives.
    pub fn is_eligible(&self, contact: &Contact) -> bool {
        let last = self.last_hop();
        !self.visits(contact.to)
            && contact.frm == last.to
            && contact.end > last.start.saturating_add(last.owlt)
    }

    /// Append a contact to the route
    ///
    /// # Panics
    ///
    /// Panics if the contact fails [`Route::is_eligible`].
    pub fn append(&mut self, plan: &ContactPlan, id: ContactId) {
        let contact = &plan[id];
        assert!(
            self.is_eligible(contact),
            "contact {id} ({contact}) cannot extend route {self}"
        );
        self.hops.push(RouteHop::snapshot(id, contact));
        self.refresh_metrics();
    }

    /// A copy of this route extended by one contact
    pub fn extended(&self, plan: &ContactPlan, id: ContactId) -> Self {
        let mut route = self.clone();
        route.append(plan, id);
        route
    }

    /// Whether `node` is the transmitter or receiver of any hop
    pub fn visits(&self, node: NodeId) -> bool {
        self.hops.iter().any(|hop| hop.frm == node || hop.to == node)
    }

    pub fn hops(&self) -> &[RouteHop] {
        &self.hops
    }

    /// Contact ids in hop order
    pub fn contact_ids(&self) -> impl Iterator<Item = ContactId> + '_ {
        self.hops.iter().map(|hop| hop.contact)
    }

    pub fn first_hop(&self) -> &RouteHop {
        &self.hops[0]
    }

    pub fn last_hop(&self) -> &RouteHop {
        &self.hops[self.hops.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Node the route reaches
    pub fn to_node(&self) -> NodeId {
        self.to_node
    }

    /// Receiver of the first hop, the actionable forwarding decision
    pub fn next_node(&self) -> NodeId {
        self.next_node
    }

    /// Start of the first hop
    pub fn from_time(&self) -> Time {
        self.from_time
    }

    /// Earliest end over every hop, the route's validity bound
    pub fn to_time(&self) -> Time {
        self.to_time
    }

    pub fn best_delivery_time(&self) -> Time {
        self.best_delivery_time
    }

    /// Bottleneck volume of the route
    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Arrival at the last hop's receiver when leaving the source at `ready`
    pub fn arrival_from(&self, ready: Time) -> Time {
        self.hops
            .iter()
            .fold(ready, |arrival, hop| hop.arrival_from(arrival))
    }

    /// Hops whose end equals the route's validity bound
    pub fn limiting_hops(&self) -> impl Iterator<Item = &RouteHop> + '_ {
        let bound = self.to_time;
        self.hops.iter().filter(move |hop| hop.end == bound)
    }

    /// Whether both routes traverse the same contacts in the same order
    pub fn same_hops(&self, other: &Route) -> bool {
        self.hops.len() == other.hops.len() && self.contact_ids().eq(other.contact_ids())
    }

    /// Best-first ordering: earliest delivery, then larger volume, then higher
    /// confidence
    pub fn best_first(a: &Route, b: &Route) -> Ordering {
        a.best_delivery_time
            .cmp(&b.best_delivery_time)
            .then_with(|| b.volume.cmp(&a.volume))
            .then_with(|| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(Ordering::Equal)
            })
    }

    fn refresh_metrics(&mut self) {
        let first = &self.hops[0];
        self.next_node = first.to;
        self.from_time = first.start;
        self.to_node = self.last_hop().to;
        self.to_time = self.hops.iter().map(|hop| hop.end).min().unwrap_or(INFINITE_TIME);
        self.confidence = self.hops.iter().map(|hop| hop.confidence).product();

        self.best_delivery_time = 0;
        for hop in &self.hops {
            self.best_delivery_time = self
                .best_delivery_time
                .saturating_add(hop.owlt)
                .max(hop.start.saturating_add(hop.owlt));
        }

        // earliest end among each hop and its successors
        let mut stops = vec![INFINITE_TIME; self.hops.len()];
        let mut running = INFINITE_TIME;
        for (index, hop) in self.hops.iter().enumerate().rev() {
            running = running.min(hop.end);
            stops[index] = running;
        }

        let mut prev_arrival = 0;
        let mut volume = Volume::MAX;
        for (index, hop) in self.hops.iter_mut().enumerate() {
            hop.first_byte_tx_time = if index == 0 {
                hop.start
            } else {
                hop.start.max(prev_arrival)
            };
            hop.last_byte_arr_time = hop.first_byte_tx_time.saturating_add(hop.owlt);
            prev_arrival = hop.last_byte_arr_time;

            let duration = stops[index].saturating_sub(hop.first_byte_tx_time);
            hop.effective_volume_limit = duration.saturating_mul(hop.rate).min(hop.volume);
            volume = volume.min(hop.effective_volume_limit);
        }
        self.volume = volume;
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "to:{}|via:{}({:03},{:03})|bdt:{}|hops:{}|vol:{}|conf:{:.1}|[",
            self.to_node,
            self.next_node,
            self.from_time,
            self.to_time,
            self.best_delivery_time,
            self.hops.len(),
            self.volume,
            self.confidence
        )?;
        for (index, hop) in self.hops.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{hop}")?;
        }
        write!(f, "]")
    }
}
