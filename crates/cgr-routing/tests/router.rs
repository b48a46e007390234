//! Router behaviour over a changing network
//!
//! Link flaps, shared next-hop tables and capacity commitment across many
//! forwarded bundles.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use cgr_core::{Bundle, Contact, ContactId, ContactPlan, Priority};
use cgr_logging::NodeContextGuard;
use cgr_routing::{CgrConfig, ContactGraphRouter, RouteUpdate, SearchAlgorithm, StrategyKind};

// Test helpers

/// Node 1 reaches 5 through 2 (fast), 3 (slow) or 4 (late)
fn relay_plan() -> ContactPlan {
    ContactPlan::from_contacts([
        Contact::new(1, 2, 0, 100, 10).with_owlt(1),
        Contact::new(2, 5, 0, 100, 10).with_owlt(1),
        Contact::new(1, 3, 0, 100, 10).with_owlt(5),
        Contact::new(3, 5, 0, 100, 10).with_owlt(5),
        Contact::new(1, 4, 50, 150, 10).with_owlt(1),
        Contact::new(4, 5, 50, 150, 10).with_owlt(1),
    ])
    .unwrap()
}

fn router(config: CgrConfig) -> ContactGraphRouter {
    cgr_logging::init_testing();
    ContactGraphRouter::try_new(relay_plan(), config, 1).unwrap()
}

#[test]
fn test_link_flapping() {
    let mut router = router(CgrConfig::default());
    let _context = NodeContextGuard::new(router.local_node());

    router.track_destination(5);
    let updates = router.compute_all_routes(0);
    assert_eq!(
        updates,
        vec![RouteUpdate {
            destination: 5,
            previous: None,
            next_hop: Some(2),
        }]
    );

    let updates = router.on_link_down(2, 10);
    assert_eq!(updates[0].next_hop, Some(3));

    let updates = router.on_link_down(3, 10);
    assert_eq!(updates[0].next_hop, Some(4));

    // 4 is down before its contact opens; the contact is still planned
    let updates = router.on_link_down(4, 10);
    assert!(updates.is_empty());
    assert_eq!(router.table().next_hop(5), Some(4));

    let updates = router.on_link_up(2, 20);
    assert_eq!(updates[0].previous, Some(4));
    assert_eq!(updates[0].next_hop, Some(2));
}

#[test]
fn test_forwarding_agrees_with_table_while_links_are_down() {
    let mut router = router(CgrConfig::default());
    router.track_destination(5);
    for neighbour in [2, 3, 4] {
        router.on_link_down(neighbour, 10);
    }
    assert_eq!(router.table().next_hop(5), Some(4));

    // 4 is down, but its contact only opens at 50
    let bundle = Bundle::new(1, 5, 10, 1000);
    let chosen = router
        .forward(&bundle, 10, &mut HashSet::new())
        .unwrap()
        .unwrap();
    assert_eq!(chosen.next_node(), 4);
    assert_eq!(chosen.route.first_hop().contact, ContactId(4));
    assert!(router.plan()[ContactId(4)].mav(Priority::Normal) < 1000);
}

#[test]
fn test_unreachable_when_every_link_is_down() {
    let mut router = router(CgrConfig::default());
    router.track_destination(5);
    router.compute_all_routes(60);

    router.on_link_down(2, 60);
    router.on_link_down(3, 60);
    let updates = router.on_link_down(4, 60);
    assert_eq!(
        updates,
        vec![RouteUpdate {
            destination: 5,
            previous: Some(4),
            next_hop: None,
        }]
    );
    assert_eq!(router.table().next_hop(5), None);
    assert!(router.table().get(5).is_some());
}

#[test]
fn test_search_algorithms_agree() {
    let by_contact = router(CgrConfig::default());
    let by_node = router(CgrConfig::default().with_search(SearchAlgorithm::Multigraph));

    for time in [0, 40, 99, 120] {
        for destination in 2..=5 {
            let a = by_contact.compute_optimal_route(destination, time);
            let b = by_node.compute_optimal_route(destination, time);
            assert_eq!(
                a.map(|route| route.arrival_from(time)),
                b.map(|route| route.arrival_from(time)),
                "disagreement for {destination} at {time}"
            );
        }
    }
}

#[test]
fn test_table_is_shared_with_readers() {
    let mut router = router(CgrConfig::default());
    for destination in 2..=5 {
        router.track_destination(destination);
    }
    router.compute_all_routes(0);

    let table = router.table();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                (0..1000_u64)
                    .filter(|i| table.get(2 + i % 4).is_some())
                    .count()
            })
        })
        .collect();

    router.on_link_down(2, 0);

    for reader in readers {
        assert_eq!(reader.join().unwrap(), 1000);
    }
    assert_eq!(table.destinations(), vec![2, 3, 4, 5]);
    assert_eq!(table.next_hop(5), Some(3));
}

#[test]
fn test_forwarding_drains_capacity() {
    let mut router = router(CgrConfig::default());
    let mut chosen = Vec::new();

    // each bundle costs 103 units; 1->2 carries 1000
    for _ in 0..12 {
        let bundle = Bundle::new(1, 5, 100, 1000).without_fragmentation();
        match router.forward(&bundle, 0, &mut HashSet::new()).unwrap() {
            Some(candidate) => chosen.push(candidate.next_node()),
            None => break,
        }
    }

    assert_eq!(chosen.iter().filter(|&&next| next == 2).count(), 9);
    assert!(chosen[9..].iter().all(|&next| next != 2));

    let first = &router.plan()[ContactId(0)];
    assert_eq!(first.mav(Priority::Normal), 1000 - 9 * 103);
    assert_eq!(first.mav(Priority::Expedited), 1000);
}

#[test]
fn test_expedited_bundles_keep_their_own_capacity() {
    let mut router = router(CgrConfig::default());
    let normal = Bundle::new(1, 5, 1000, 1000);
    let expedited = Bundle::new(1, 5, 1000, 1000).with_priority(Priority::Expedited);

    let first = router
        .forward(&normal, 0, &mut HashSet::new())
        .unwrap()
        .unwrap();
    let second = router
        .forward(&expedited, 0, &mut HashSet::new())
        .unwrap()
        .unwrap();
    assert_eq!(first.next_node(), 2);
    assert_eq!(second.next_node(), 2);
}

#[test]
fn test_route_lists_follow_strategy() {
    for strategy in [
        StrategyKind::KBest { k: 2 },
        StrategyKind::Anchor,
        StrategyKind::DepthFirst,
        StrategyKind::DepletedFirst,
        StrategyKind::EndedFirst,
    ] {
        let router = router(CgrConfig::default().with_strategy(strategy));
        let routes = router.route_list(5, 0);
        assert!(!routes.is_empty(), "{strategy} found nothing");
        assert_eq!(routes[0].next_node(), 2, "{strategy} ranks 2 first");
        if let StrategyKind::KBest { k } = strategy {
            assert!(routes.len() <= k);
        }
    }
}

#[test]
fn test_sender_is_not_used_as_next_hop() {
    let mut router = router(CgrConfig::default());
    let bundle = Bundle::new(2, 5, 10, 1000).with_sender(2);

    let mut excluded = HashSet::new();
    let chosen = router.forward(&bundle, 0, &mut excluded).unwrap().unwrap();
    assert_eq!(chosen.next_node(), 3);
    assert!(excluded.contains(&2));

    let mut router = ContactGraphRouter::try_new(
        relay_plan(),
        CgrConfig::default().with_return_to_sender(true),
        1,
    )
    .unwrap();
    let chosen = router
        .forward(&bundle, 0, &mut HashSet::new())
        .unwrap()
        .unwrap();
    assert_eq!(chosen.next_node(), 2);
}
