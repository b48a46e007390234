//! Contact graph router
//!
//! The [`ContactGraphRouter`] owns a contact plan on behalf of one local node.
//! It keeps the next hop of every tracked destination in a shared
//! [`NextHopTable`], recomputing it when links to neighbours go down or come
//! back, and commits the capacity of each forwarding decision to the plan.
//!
//! All mutation goes through `&mut self`, so one router is the single writer
//! of its plan. Readers of forwarding decisions share the table instead.
//!
//! ## Link filtering
//!
//! While a neighbour's link is down, contacts from the local node to that
//! neighbour whose window is open at the query time are ignored by the
//! next-hop search, route lists and forwarding alike. Future contacts to the
//! neighbour stay usable.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use cgr_core::{Bundle, ContactPlan, NodeId, Route, Time, Volume};
use tracing::{debug, info, instrument, warn};

use crate::error::{RoutingError, RoutingResult};
use crate::forwarding::{CandidateRoute, ForwardingSelector};
use crate::multigraph::ContactMultigraph;
use crate::search::{RouteSearch, SearchOrigin};
use crate::strategy::RouteQuery;
use crate::suppression::Suppression;
use crate::table::NextHopTable;
use crate::{CgrConfig, SearchAlgorithm};

/// A change of next hop for one destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteUpdate {
    pub destination: NodeId,
    /// Next hop before the update, `None` if there was no route
    pub previous: Option<NodeId>,
    /// Next hop after the update, `None` if there is no route
    pub next_hop: Option<NodeId>,
}

/// Contact graph router for one local node
pub struct ContactGraphRouter {
    plan: ContactPlan,
    config: CgrConfig,
    local_node: NodeId,
    /// Node-level view of the plan, built once since topology never changes
    multigraph: ContactMultigraph,
    /// Neighbours whose link is currently down
    links_down: HashSet<NodeId>,
    /// Queued volume per neighbour, fed to the forwarding selector
    backlog: HashMap<NodeId, Volume>,
    tracked: BTreeSet<NodeId>,
    table: Arc<NextHopTable>,
}

impl ContactGraphRouter {
    /// Create a router, rejecting configurations with error-level warnings
    ///
    /// Other warnings are logged.
    pub fn try_new(plan: ContactPlan, config: CgrConfig, local_node: NodeId) -> RoutingResult<Self> {
        let warnings = config.validate();
        if warnings.iter().any(|warning| warning.is_error()) {
            return Err(RoutingError::InvalidConfig(warnings));
        }
        for warning in &warnings {
            warn!(%warning, "Routing configuration warning");
        }

        let multigraph = ContactMultigraph::new(&plan);
        debug!(
            local_node,
            contacts = plan.len(),
            strategy = %config.strategy,
            "Router created"
        );
        Ok(Self {
            plan,
            config,
            local_node,
            multigraph,
            links_down: HashSet::new(),
            backlog: HashMap::new(),
            tracked: BTreeSet::new(),
            table: Arc::new(NextHopTable::default()),
        })
    }

    pub fn local_node(&self) -> NodeId {
        self.local_node
    }

    pub fn plan(&self) -> &ContactPlan {
        &self.plan
    }

    pub fn config(&self) -> &CgrConfig {
        &self.config
    }

    /// Handle to the next-hop table for readers
    pub fn table(&self) -> Arc<NextHopTable> {
        Arc::clone(&self.table)
    }

    pub fn is_link_down(&self, neighbour: NodeId) -> bool {
        self.links_down.contains(&neighbour)
    }

    /// Declare the volume queued for a neighbour
    pub fn set_backlog(&mut self, neighbour: NodeId, volume: Volume) {
        self.backlog.insert(neighbour, volume);
    }

    /// Restore every contact to its full volume
    pub fn reset_capacity(&mut self) {
        self.plan.reset_capacity();
    }

    /// Best route to `destination` leaving the local node at `now`
    pub fn compute_optimal_route(&self, destination: NodeId, now: Time) -> Option<Route> {
        let suppression = self.link_filter(now);
        debug!(
            destination,
            now,
            search = ?self.config.search,
            filtered = suppression.suppressed_count(),
            "Computing optimal route"
        );
        match self.config.search {
            SearchAlgorithm::ContactGraph => RouteSearch::new(&self.plan).find(
                &SearchOrigin::node(self.local_node, now),
                destination,
                &suppression,
            ),
            SearchAlgorithm::Multigraph => {
                self.multigraph
                    .find(&self.plan, self.local_node, destination, now, &suppression)
            }
        }
    }

    /// Start keeping a next hop for `destination`
    ///
    /// The table entry starts without a next hop until routes are computed.
    pub fn track_destination(&mut self, destination: NodeId) {
        if self.tracked.insert(destination) && self.table.get(destination).is_none() {
            self.table.insert(destination, None);
        }
    }

    /// Stop keeping a next hop for `destination`
    pub fn untrack_destination(&mut self, destination: NodeId) {
        self.tracked.remove(&destination);
        self.table.remove(destination);
    }

    /// Tracked destinations, in ascending order
    pub fn destinations(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tracked.iter().copied()
    }

    /// Recompute the next hop of every tracked destination
    ///
    /// Returns only the destinations whose next hop changed.
    #[instrument(skip(self), fields(local_node = self.local_node))]
    pub fn compute_all_routes(&mut self, now: Time) -> Vec<RouteUpdate> {
        let mut updates = Vec::new();
        for &destination in &self.tracked {
            let next_hop = self
                .compute_optimal_route(destination, now)
                .map(|route| route.next_node());
            let previous = self.table.next_hop(destination);

            if next_hop == previous {
                debug!(destination, ?next_hop, "Next hop unchanged");
                self.table.confirm(destination);
                continue;
            }

            self.table.insert(destination, next_hop);
            info!(destination, ?next_hop, ?previous, "Route updated");
            updates.push(RouteUpdate {
                destination,
                previous,
                next_hop,
            });
        }
        updates
    }

    /// Mark the link to `neighbour` down and reroute
    pub fn on_link_down(&mut self, neighbour: NodeId, now: Time) -> Vec<RouteUpdate> {
        if self.links_down.insert(neighbour) {
            info!(neighbour, now, "Link down");
        }
        self.compute_all_routes(now)
    }

    /// Mark the link to `neighbour` up and reroute
    pub fn on_link_up(&mut self, neighbour: NodeId, now: Time) -> Vec<RouteUpdate> {
        if self.links_down.remove(&neighbour) {
            info!(neighbour, now, "Link up");
        }
        self.compute_all_routes(now)
    }

    /// Route list to `destination` using the configured strategy
    pub fn route_list(&self, destination: NodeId, now: Time) -> Vec<Route> {
        let query = RouteQuery::new(self.local_node, destination, now);
        let enumerator = self.config.strategy.enumerator();
        let routes = enumerator.enumerate_with(&self.plan, &query, &self.link_filter(now));
        debug!(
            destination,
            strategy = enumerator.name(),
            routes = routes.len(),
            "Route list computed"
        );
        routes
    }

    /// Forwarding candidates for `bundle`, best-first
    pub fn candidates(
        &self,
        bundle: &Bundle,
        now: Time,
        excluded: &mut HashSet<NodeId>,
    ) -> Vec<CandidateRoute> {
        let routes = self.route_list(bundle.dst, now);
        self.selector()
            .select(now, self.local_node, &self.plan, bundle, &routes, excluded)
    }

    /// Choose the best candidate for `bundle` and commit its volume
    ///
    /// The bundle's estimated volume is taken out of its own priority tier on
    /// every hop of the chosen route. Returns `Ok(None)` when no route is
    /// admissible, leaving the plan unchanged.
    #[instrument(skip(self, bundle, excluded), fields(local_node = self.local_node, destination = bundle.dst))]
    pub fn forward(
        &mut self,
        bundle: &Bundle,
        now: Time,
        excluded: &mut HashSet<NodeId>,
    ) -> RoutingResult<Option<CandidateRoute>> {
        let Some(chosen) = self.candidates(bundle, now, excluded).into_iter().next() else {
            debug!("No admissible route, holding bundle");
            return Ok(None);
        };

        let volume = bundle.evc_volume();
        self.plan
            .consume(chosen.route.contact_ids(), bundle.priority, volume)?;
        info!(
            next_node = chosen.next_node(),
            volume,
            priority = ?bundle.priority,
            "Bundle forwarded"
        );
        Ok(Some(chosen))
    }

    fn selector(&self) -> ForwardingSelector {
        self.backlog.iter().fold(
            ForwardingSelector::new(self.config.forwarding.clone()),
            |selector, (&neighbour, &volume)| selector.with_backlog(neighbour, volume),
        )
    }

    /// Suppress open contacts from the local node to neighbours whose link is down
    fn link_filter(&self, now: Time) -> Suppression {
        let mut suppression = Suppression::new();
        for &id in self.plan.departing(self.local_node) {
            let contact = &self.plan[id];
            if self.links_down.contains(&contact.to) && contact.is_active_at(now) {
                suppression.suppress(id);
            }
        }
        suppression
    }
}
