//! End-to-end routing scenarios
//!
//! Hand-built plans checked against every enumeration strategy and the
//! forwarding selector, plus invariants that must hold on random plans.

use std::collections::HashSet;

use cgr_core::{Bundle, Contact, ContactId, ContactPlan, NodeId, Route, Time};
use cgr_routing::{
    ContactMultigraph, ForwardingSelector, RouteEnumerator, RouteQuery, StrategyKind, Suppression,
    earliest_route,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

// Test helpers

/// Five nodes, seven contacts, five loop-free paths from 1 to 3
fn tutorial_plan() -> ContactPlan {
    ContactPlan::from_contacts([
        Contact::new(1, 2, 0, 100, 10).with_owlt(1),
        Contact::new(2, 3, 10, 100, 10).with_owlt(1),
        Contact::new(1, 4, 0, 50, 10).with_owlt(2),
        Contact::new(4, 3, 5, 60, 10).with_owlt(2),
        Contact::new(2, 4, 20, 40, 5).with_owlt(1),
        Contact::new(4, 5, 0, 100, 10).with_owlt(1),
        Contact::new(5, 3, 30, 80, 10).with_owlt(1),
    ])
    .unwrap()
}

fn all_strategies() -> Vec<StrategyKind> {
    vec![
        StrategyKind::KBest { k: 10 },
        StrategyKind::Anchor,
        StrategyKind::DepthFirst,
        StrategyKind::DepletedFirst,
        StrategyKind::EndedFirst,
    ]
}

fn ids(route: &Route) -> Vec<usize> {
    route.contact_ids().map(ContactId::index).collect()
}

/// Structural checks every enumerated route must pass
fn assert_well_formed(route: &Route, source: NodeId, destination: NodeId) {
    let hops = route.hops();
    assert_eq!(hops[0].frm, source, "route {route} leaves the wrong node");
    assert_eq!(route.to_node(), destination);
    for pair in hops.windows(2) {
        assert_eq!(pair[0].to, pair[1].frm, "route {route} is not contiguous");
    }

    let mut seen = HashSet::from([source]);
    for hop in hops {
        assert!(seen.insert(hop.to), "route {route} revisits node {}", hop.to);
    }
}

/// Hop entry times and delivery bounds of a searched route
fn assert_search_invariants(route: &Route, time: Time) {
    let mut arrival = time;
    let mut bdt = 0;
    for hop in route.hops() {
        assert!(
            hop.end > arrival,
            "hop {hop} entered at {arrival} after it closed"
        );
        arrival = hop.arrival_from(arrival);

        let next_bdt = (bdt + hop.owlt).max(hop.start + hop.owlt);
        assert!(next_bdt >= bdt);
        bdt = next_bdt;
    }
    assert_eq!(route.best_delivery_time(), bdt);

    let bottleneck = route
        .hops()
        .iter()
        .map(|hop| hop.effective_volume_limit)
        .min()
        .unwrap();
    assert_eq!(route.volume(), bottleneck);
}

// ============================================================================
// Route search
// ============================================================================

#[test]
fn test_two_hop_delivery_time() {
    let plan = ContactPlan::from_contacts([
        Contact::new(1, 2, 0, 100, 10).with_owlt(1),
        Contact::new(2, 3, 10, 100, 10).with_owlt(1),
    ])
    .unwrap();

    let route = earliest_route(&plan, 1, 3, 0).unwrap();
    assert_eq!(route.len(), 2);
    assert_eq!(route.next_node(), 2);
    assert_eq!(route.best_delivery_time(), 11);
}

#[test]
fn test_second_hop_window_boundary() {
    // still open when the bundle reaches node 2 at time 1
    let plan = ContactPlan::from_contacts([
        Contact::new(1, 2, 0, 100, 10).with_owlt(1),
        Contact::new(2, 3, 0, 5, 10).with_owlt(1),
    ])
    .unwrap();
    let route = earliest_route(&plan, 1, 3, 0).unwrap();
    assert_eq!(route.best_delivery_time(), 2);

    // closes exactly on arrival
    let plan = ContactPlan::from_contacts([
        Contact::new(1, 2, 0, 100, 10).with_owlt(1),
        Contact::new(2, 3, 0, 1, 10).with_owlt(1),
    ])
    .unwrap();
    assert!(earliest_route(&plan, 1, 3, 0).is_none());
}

#[test]
fn test_tied_delivery_prefers_volume() {
    let plan = ContactPlan::from_contacts([
        Contact::new(1, 2, 0, 100, 5).with_owlt(1),
        Contact::new(1, 2, 0, 100, 10).with_owlt(1),
    ])
    .unwrap();

    let routes = StrategyKind::KBest { k: 2 }
        .enumerator()
        .enumerate(&plan, &RouteQuery::new(1, 2, 0));
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].best_delivery_time(), routes[1].best_delivery_time());
    assert_eq!(ids(&routes[0]), vec![1]);
    assert_eq!(routes[0].volume(), 1000);
    assert_eq!(routes[1].volume(), 500);
}

#[test]
fn test_tiny_hop_limits_route_volume() {
    let plan = ContactPlan::from_contacts([
        Contact::new(1, 2, 0, 100, 10),
        Contact::new(2, 3, 0, 100, 10),
        Contact::new(3, 4, 50, 51, 3),
    ])
    .unwrap();

    let route = earliest_route(&plan, 1, 4, 0).unwrap();
    assert_eq!(route.volume(), 3);
}

#[test]
fn test_tutorial_earliest_route() {
    let plan = tutorial_plan();
    let route = earliest_route(&plan, 1, 3, 0).unwrap();
    assert_eq!(ids(&route), vec![2, 3]);
    assert_eq!(route.next_node(), 4);
    assert_eq!(route.best_delivery_time(), 7);

    let multigraph = ContactMultigraph::new(&plan);
    let node_route = multigraph
        .find(&plan, 1, 3, 0, &Suppression::new())
        .unwrap();
    assert_eq!(node_route.arrival_from(0), route.arrival_from(0));
}

// ============================================================================
// Enumeration strategies
// ============================================================================

#[test]
fn test_depth_first_finds_every_path() {
    let plan = tutorial_plan();
    let routes = StrategyKind::DepthFirst
        .enumerator()
        .enumerate(&plan, &RouteQuery::new(1, 3, 0));

    let mut paths: Vec<Vec<usize>> = routes.iter().map(ids).collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            vec![0, 1],
            vec![0, 4, 3],
            vec![0, 4, 5, 6],
            vec![2, 3],
            vec![2, 5, 6],
        ]
    );
}

#[test]
fn test_kbest_ranks_tutorial_routes() {
    let plan = tutorial_plan();
    let routes = StrategyKind::KBest { k: 3 }
        .enumerator()
        .enumerate(&plan, &RouteQuery::new(1, 3, 0));

    let bdts: Vec<Time> = routes.iter().map(Route::best_delivery_time).collect();
    assert_eq!(bdts, vec![7, 11, 23]);
    assert_eq!(ids(&routes[1]), vec![0, 1]);
    assert_eq!(ids(&routes[2]), vec![0, 4, 3]);
}

#[test]
fn test_every_strategy_yields_valid_routes() {
    let plan = tutorial_plan();
    let query = RouteQuery::new(1, 3, 0);
    let all_paths: Vec<Vec<usize>> = StrategyKind::DepthFirst
        .enumerator()
        .enumerate(&plan, &query)
        .iter()
        .map(ids)
        .collect();
    let best = earliest_route(&plan, 1, 3, 0).unwrap();

    for strategy in all_strategies() {
        let routes = strategy.enumerator().enumerate(&plan, &query);
        assert!(!routes.is_empty(), "{strategy} found nothing");
        assert!(
            routes[0].same_hops(&best),
            "{strategy} does not start with the earliest route"
        );

        for route in &routes {
            assert_well_formed(route, 1, 3);
            assert!(
                all_paths.contains(&ids(route)),
                "{strategy} produced an unknown path {route}"
            );
        }

        if strategy.is_ranked() {
            assert!(
                routes
                    .windows(2)
                    .all(|pair| Route::best_first(&pair[0], &pair[1]).is_le()),
                "{strategy} output is not ranked"
            );
        }
    }
}

#[test]
fn test_strategies_on_unreachable_destination() {
    let plan = tutorial_plan();
    for strategy in all_strategies() {
        let routes = strategy
            .enumerator()
            .enumerate(&plan, &RouteQuery::new(3, 1, 0));
        assert!(routes.is_empty(), "{strategy} invented a route");
    }
}

#[test]
fn test_late_query_time_skips_closed_contacts() {
    let plan = tutorial_plan();
    // 1->4 closes at 50
    let route = earliest_route(&plan, 1, 3, 55).unwrap();
    assert_eq!(ids(&route), vec![0, 1]);
    assert_eq!(route.arrival_from(55), 57);

    let routes = StrategyKind::DepthFirst
        .enumerator()
        .enumerate(&plan, &RouteQuery::new(1, 3, 55));
    assert!(routes.iter().all(|route| route.first_hop().contact != ContactId(2)));
    // 2->4 closes at 40, before the bundle reaches 2
    assert_eq!(routes.len(), 1);
    assert_eq!(ids(&routes[0]), vec![0, 1]);
}

// ============================================================================
// Forwarding
// ============================================================================

#[test]
fn test_forwarding_over_tutorial_routes() {
    let plan = tutorial_plan();
    let routes = StrategyKind::KBest { k: 10 }
        .enumerator()
        .enumerate(&plan, &RouteQuery::new(1, 3, 0));
    let selector = ForwardingSelector::default();

    // 100 units at rate 10 adds 10 per hop
    let bundle = Bundle::new(1, 3, 100, 30);
    let candidates = selector.select(0, 1, &plan, &bundle, &routes, &mut HashSet::new());
    assert!(!candidates.is_empty());
    assert_eq!(candidates[0].next_node(), 4);
    assert!(candidates.iter().all(|c| c.projected_arrival <= 30.0));

    // node 2 was the previous hop
    let bundle = Bundle::new(1, 3, 100, 1000).with_sender(2);
    let mut excluded = HashSet::new();
    let candidates = selector.select(0, 1, &plan, &bundle, &routes, &mut excluded);
    assert!(candidates.iter().all(|c| c.next_node() != 2));
    assert!(excluded.contains(&2));
}

// ============================================================================
// Random plans
// ============================================================================

#[test]
fn test_random_plan_search_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..30 {
        let plan = ContactPlan::random(60, 8, &mut rng);
        let multigraph = ContactMultigraph::new(&plan);
        for destination in 2..=8 {
            let time = [0, 200, 500].choose(&mut rng).copied().unwrap();
            let route = earliest_route(&plan, 1, destination, time);
            let node_route = multigraph.find(&plan, 1, destination, time, &Suppression::new());
            assert_eq!(route.is_some(), node_route.is_some());

            if let Some(route) = route {
                assert_well_formed(&route, 1, destination);
                assert_search_invariants(&route, time);
            }
            if let Some(node_route) = node_route {
                assert_search_invariants(&node_route, time);
            }
        }
    }
}

#[test]
fn test_random_plan_kbest_is_ranked_and_unique() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
        let plan = ContactPlan::random(40, 6, &mut rng);
        let query = RouteQuery::new(1, 6, 0);
        let routes = StrategyKind::KBest { k: 8 }.enumerator().enumerate(&plan, &query);
        assert!(routes.len() <= 8);

        for (index, route) in routes.iter().enumerate() {
            assert_well_formed(route, 1, 6);
            assert_search_invariants(route, 0);
            assert!(
                routes[index + 1..].iter().all(|other| !other.same_hops(route)),
                "duplicate route {route}"
            );
        }
        assert!(
            routes
                .windows(2)
                .all(|pair| Route::best_first(&pair[0], &pair[1]).is_le())
        );
    }
}

#[test]
fn test_random_plan_forwarding_respects_deadline() {
    let mut rng = StdRng::seed_from_u64(23);
    let selector = ForwardingSelector::default();
    for _ in 0..20 {
        let plan = ContactPlan::random(50, 6, &mut rng);
        let routes = StrategyKind::KBest { k: 5 }
            .enumerator()
            .enumerate(&plan, &RouteQuery::new(1, 5, 0));

        for deadline in [100, 500, 1000] {
            let bundle = Bundle::new(1, 5, 20, deadline);
            let candidates =
                selector.select(0, 1, &plan, &bundle, &routes, &mut HashSet::new());
            assert!(
                candidates
                    .iter()
                    .all(|c| c.projected_arrival <= deadline as f64)
            );
        }
    }
}
