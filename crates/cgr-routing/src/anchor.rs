//! Anchor search
//!
//! After each route the contact that bounds the route's validity window is
//! suppressed. When that contact is not the first hop, the first hop becomes
//! the anchor and the search keeps looking for alternatives that leave through
//! it. The anchored phase ends at the first route leaving through another
//! contact (that route is discarded): suppressions not departing the source
//! are lifted, the anchor itself is suppressed, and the unrestricted search
//! resumes.

use cgr_core::{ContactId, ContactPlan, Route};
use tracing::debug;

use crate::search::{RouteSearch, SearchOrigin};
use crate::strategy::{RouteEnumerator, RouteQuery};
use crate::suppression::Suppression;

/// Anchor-based route enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnchorSearch;

impl RouteEnumerator for AnchorSearch {
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
        let mut anchor: Option<ContactId> = None;

        while let Some(route) = search.find(&origin, query.destination, &suppression) {
            let first = route.first_hop();

            if let Some(anchored) = anchor
                && anchored != first.contact
            {
                debug!(anchor = %anchored, "Anchored search exhausted");
                suppression.release_where(|id| plan[id].frm != query.source);
                suppression.suppress(anchored);
                anchor = None;
                continue;
            }

            let limiting = if route.to_time() == first.end {
                first.contact
            } else {
                anchor = Some(first.contact);
                route
                    .limiting_hops()
                    .next()
                    .map_or(first.contact, |hop| hop.contact)
            };
            debug!(route = %route, limiting = %limiting, anchor = ?anchor, "Route accepted");
            suppression.suppress(limiting);
            routes.push(route);
        }

        routes
    }

    fn name(&self) -> &'static str {
        "anchor"
    }
}
