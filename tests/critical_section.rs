// tests/critical_section.rs

use std::collections::{BTreeMap, BTreeSet};

use fleetcoord::coord::{critical_points, fragment_route, split_critical_paths, ActiveRoute};
use fleetcoord::map::{reconstruct_nodes, Route, RouteFragment};

/// Route through `nodes` with the given per-edge distances.
fn route(nodes: &[&str], distances: &[f64]) -> Route {
    assert_eq!(nodes.len(), distances.len() + 1);
    Route {
        nodes: nodes.iter().map(|n| n.to_string()).collect(),
        edges: nodes.windows(2).map(|w| format!("{}_{}", w[0], w[1])).collect(),
        distances: distances.to_vec(),
    }
}

fn names(fragment: &RouteFragment) -> Vec<&str> {
    fragment.nodes.iter().map(String::as_str).collect()
}

fn routes(entries: Vec<(&str, ActiveRoute)>) -> BTreeMap<String, ActiveRoute> {
    entries
        .into_iter()
        .map(|(id, r)| (id.to_string(), r))
        .collect()
}

#[test]
fn test_closest_robot_wins_shared_node() {
    let active = routes(vec![
        (
            "A",
            ActiveRoute::new(route(&["a0", "a1", "a2", "X", "a3"], &[1.0, 1.0, 1.0, 1.0])),
        ),
        ("B", ActiveRoute::new(route(&["b0", "X", "b1"], &[1.0, 1.0]))),
    ]);

    let plan = split_critical_paths(&active);

    assert_eq!(plan.winners.get("X").map(String::as_str), Some("B"));
    assert_eq!(plan.won_by("B"), BTreeSet::from(["X"]));
    assert!(plan.won_by("A").is_empty());

    // A stops right before X.
    let a = &plan.fragments["A"];
    assert_eq!(a.len(), 2);
    assert_eq!(names(&a[0]), vec!["a0", "a1", "a2"]);
    assert_eq!(names(&a[1]), vec!["a2", "X", "a3"]);
    assert_eq!(a[0].edges, vec!["a0_a1", "a1_a2"]);

    // B may cross X and is not cut any further.
    let b = plan.first_fragment("B").unwrap();
    assert_eq!(names(b), vec!["b0", "X", "b1"]);
    assert_eq!(plan.fragments["B"].len(), 1);
}

#[test]
fn test_tie_goes_to_lowest_robot_id() {
    let active = routes(vec![
        ("r2", ActiveRoute::new(route(&["p", "X", "q"], &[2.0, 1.0]))),
        ("r1", ActiveRoute::new(route(&["s", "X", "t"], &[2.0, 1.0]))),
    ]);

    let plan = split_critical_paths(&active);
    assert_eq!(plan.winners["X"], "r1");

    // The loser holds where it stands.
    let held = plan.first_fragment("r2").unwrap();
    assert!(held.is_hold());
    assert_eq!(held.start(), Some("p"));
}

#[test]
fn test_winner_releases_point_one_node_after() {
    let active = routes(vec![
        (
            "w",
            ActiveRoute::new(route(&["w0", "X", "w2", "w3", "w4"], &[1.0, 1.0, 1.0, 1.0])),
        ),
        ("l", ActiveRoute::new(route(&["l0", "l1", "X"], &[3.0, 3.0]))),
    ]);

    let plan = split_critical_paths(&active);
    assert_eq!(plan.winners["X"], "w");

    let w = &plan.fragments["w"];
    assert_eq!(names(&w[0]), vec!["w0", "X", "w2"]);
    assert_eq!(names(&w[1]), vec!["w2", "w3", "w4"]);

    let l = &plan.fragments["l"];
    assert_eq!(names(&l[0]), vec!["l0", "l1"]);
    assert_eq!(names(&l[1]), vec!["l1", "X"]);
}

#[test]
fn test_picker_only_conflict_is_exempt() {
    // r1 heads to its picker P; r2 waits on P with a stub route.
    let active = routes(vec![
        (
            "r1",
            ActiveRoute::to_picker(route(&["a", "b", "P"], &[1.0, 1.0]), "P"),
        ),
        ("r2", ActiveRoute::new(Route::stub("P"))),
    ]);

    let critical = critical_points(&active);
    assert!(critical["r1"].is_empty());
    assert_eq!(critical["r2"], BTreeSet::from(["P".to_string()]));

    let plan = split_critical_paths(&active);
    assert_eq!(plan.fragments["r1"].len(), 1);
    assert_eq!(names(&plan.fragments["r1"][0]), vec!["a", "b", "P"]);
}

#[test]
fn test_picker_exemption_needs_picker_to_be_the_only_conflict() {
    let active = routes(vec![
        (
            "r1",
            ActiveRoute::to_picker(route(&["a", "M", "P"], &[1.0, 1.0]), "P"),
        ),
        ("r2", ActiveRoute::new(Route::stub("P"))),
        ("r3", ActiveRoute::new(route(&["z", "M"], &[0.5]))),
    ]);

    let critical = critical_points(&active);
    assert_eq!(
        critical["r1"],
        BTreeSet::from(["M".to_string(), "P".to_string()])
    );
}

#[test]
fn test_exempt_picker_robot_still_contends_for_its_picker() {
    // r2 is one edge from its picker X; r1 passes through X further away.
    let active = routes(vec![
        (
            "r1",
            ActiveRoute::new(route(&["B1", "A1", "A2", "X", "S"], &[1.0, 1.0, 1.0, 1.0])),
        ),
        (
            "r2",
            ActiveRoute::to_picker(route(&["B2", "X"], &[1.0]), "X"),
        ),
    ]);

    let plan = split_critical_paths(&active);
    assert_eq!(plan.winners["X"], "r2");
    assert_eq!(names(plan.first_fragment("r2").unwrap()), vec!["B2", "X"]);
    assert_eq!(
        names(plan.first_fragment("r1").unwrap()),
        vec!["B1", "A1", "A2"]
    );

    // Only one of the two first fragments moves into X.
    let entering = ["r1", "r2"]
        .iter()
        .filter(|id| {
            let first = plan.first_fragment(id).unwrap();
            first.nodes.iter().skip(1).any(|n| n == "X")
        })
        .count();
    assert_eq!(entering, 1);
}

#[test]
fn test_stub_routes_block_other_robots() {
    // A waiting robot sits on W; a travelling robot must stop in front of it.
    let active = routes(vec![
        ("mover", ActiveRoute::new(route(&["a", "b", "W", "c"], &[1.0, 1.0, 1.0]))),
        ("waiter", ActiveRoute::new(Route::stub("W"))),
    ]);

    let plan = split_critical_paths(&active);
    assert_eq!(plan.winners["W"], "waiter");
    assert_eq!(names(plan.first_fragment("mover").unwrap()), vec!["a", "b"]);
    assert!(plan.first_fragment("waiter").unwrap().is_hold());
}

#[test]
fn test_route_without_critical_points_is_one_fragment() {
    let r = route(&["a", "b", "c", "d"], &[1.0, 2.0, 3.0]);
    let fragments = fragment_route(&r, "r1", &BTreeSet::new(), &BTreeMap::new());

    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].nodes, r.nodes);
    assert_eq!(fragments[0].edges, r.edges);
    assert_eq!(reconstruct_nodes(&fragments), r.nodes);
}

#[test]
fn test_empty_and_single_node_routes() {
    let none = fragment_route(&Route::default(), "r1", &BTreeSet::new(), &BTreeMap::new());
    assert!(none.is_empty());

    let single = fragment_route(&Route::stub("a"), "r1", &BTreeSet::new(), &BTreeMap::new());
    assert_eq!(single, vec![RouteFragment::hold("a")]);
}

#[test]
fn test_start_node_is_never_cut() {
    // Standing on a contested node: leaving it is always allowed.
    let r = route(&["X", "b", "c"], &[1.0, 1.0]);
    let points = BTreeSet::from(["X".to_string()]);
    let winners = BTreeMap::from([("X".to_string(), "other".to_string())]);

    let fragments = fragment_route(&r, "r1", &points, &winners);
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].nodes, r.nodes);
}
