mod common;

use std::sync::Arc;

use graphmap_lib::{
    filter_threats, route_distance, select_landmarks, shortest_path, stitch_route, Error, Graph,
    GraphBuilder, LandmarkTable, NodeId, RouteAlgorithm, RouteRequest, RoutingEngine, ThreatPolygon,
};

use common::{grid_graph, grid_id, line_graph, one_way_grid_graph};

fn all_ids(graph: &Graph) -> Vec<NodeId> {
    graph.nodes().iter().map(|node| node.id).collect()
}

fn landmark_table(graph: &Graph, k: usize) -> LandmarkTable {
    let landmarks = select_landmarks(graph, &all_ids(graph), k).expect("landmarks selected");
    LandmarkTable::build(graph, &landmarks).expect("table builds")
}

#[test]
fn dijkstra_follows_the_only_road() {
    let graph = line_graph();
    let table = LandmarkTable::empty();

    let path = shortest_path(&graph, 1, 3, RouteAlgorithm::Dijkstra, &table).expect("path");
    assert_eq!(path, vec![1, 2, 3]);
    assert_eq!(route_distance(&graph, &path).expect("distance"), 250.0);
}

#[test]
fn duplicate_road_keeps_first_length() {
    let mut builder = GraphBuilder::new();
    builder.add_node(1, 50.0, 30.0).expect("node 1");
    builder.add_node(2, 50.001, 30.0).expect("node 2");
    builder.add_node(3, 50.0005, 30.0005).expect("node 3");
    builder.add_edge(1, 2, 80.0, None).expect("first 1-2");
    builder.add_edge(1, 2, 10.0, None).expect("second 1-2");
    builder.add_two_way(1, 3, 20.0, None).expect("edge 1-3");
    builder.add_two_way(3, 2, 20.0, None).expect("edge 3-2");
    let graph = builder.build();
    let table = landmark_table(&graph, 2);

    for algorithm in [RouteAlgorithm::Dijkstra, RouteAlgorithm::Alt] {
        let path = shortest_path(&graph, 1, 2, algorithm, &table).expect("path");
        assert_eq!(path, vec![1, 3, 2], "{algorithm}");
        assert_eq!(route_distance(&graph, &path).expect("distance"), 40.0);
    }
}

#[test]
fn removing_the_middle_node_disconnects_the_line() {
    let graph = line_graph();
    let filtered = filter_threats(&graph, &[ThreatPolygon::around(50.01, 30.01, 0.001)])
        .expect("filter applies");

    for algorithm in [RouteAlgorithm::Dijkstra, RouteAlgorithm::Alt] {
        let error = shortest_path(&filtered, 1, 3, algorithm, &LandmarkTable::empty())
            .expect_err("no path");
        assert!(matches!(error, Error::NoPathFound { start: 1, goal: 3 }));
        assert!(error.is_unreachable());
    }
}

#[test]
fn same_start_and_goal_is_a_single_node() {
    let graph = grid_graph(3, 3);
    let table = landmark_table(&graph, 2);

    let path = shortest_path(&graph, 5, 5, RouteAlgorithm::Alt, &table).expect("path");
    assert_eq!(path, vec![5]);

    let route = stitch_route(&graph, &[5, 5], RouteAlgorithm::Dijkstra, &table).expect("route");
    assert_eq!(route, vec![5]);
    assert_eq!(route_distance(&graph, &route).expect("distance"), 0.0);
}

#[test]
fn alt_and_dijkstra_agree_on_every_pair() {
    let graph = grid_graph(6, 6);
    let table = landmark_table(&graph, 4);
    let ids = all_ids(&graph);

    for &start in &ids {
        for &goal in &ids {
            let dijkstra =
                shortest_path(&graph, start, goal, RouteAlgorithm::Dijkstra, &table).expect("path");
            let alt =
                shortest_path(&graph, start, goal, RouteAlgorithm::Alt, &table).expect("path");

            let expected = route_distance(&graph, &dijkstra).expect("distance");
            let actual = route_distance(&graph, &alt).expect("distance");
            assert!(
                (expected - actual).abs() < 1e-6,
                "{start} -> {goal}: dijkstra {expected}, alt {actual}"
            );
            assert_eq!(alt.first(), Some(&start));
            assert_eq!(alt.last(), Some(&goal));
        }
    }
}

#[test]
fn alt_stays_optimal_with_one_way_streets() {
    let graph = one_way_grid_graph(5, 5);
    let table = landmark_table(&graph, 3);
    let ids = all_ids(&graph);

    for &start in &ids {
        for &goal in &ids {
            let dijkstra = shortest_path(&graph, start, goal, RouteAlgorithm::Dijkstra, &table);
            let alt = shortest_path(&graph, start, goal, RouteAlgorithm::Alt, &table);
            match (dijkstra, alt) {
                (Ok(dijkstra), Ok(alt)) => {
                    let expected = route_distance(&graph, &dijkstra).expect("distance");
                    let actual = route_distance(&graph, &alt).expect("distance");
                    assert!((expected - actual).abs() < 1e-6, "{start} -> {goal}");
                }
                (Err(_), Err(_)) => {}
                (dijkstra, alt) => {
                    panic!("{start} -> {goal}: reachability differs ({dijkstra:?} vs {alt:?})")
                }
            }
        }
    }
}

#[test]
fn landmark_table_is_reused_on_filtered_graph() {
    let graph = grid_graph(5, 5);
    let table = landmark_table(&graph, 3);

    // Block the centre of the grid.
    let centre = graph.node_by_id(grid_id(5, 2, 2)).expect("centre node");
    let filtered = filter_threats(
        &graph,
        &[ThreatPolygon::around(centre.lat, centre.lon, 0.0002)],
    )
    .expect("filter applies");
    assert_eq!(filtered.node_count(), graph.node_count() - 1);

    let start = grid_id(5, 2, 0);
    let goal = grid_id(5, 2, 4);
    let dijkstra =
        shortest_path(&filtered, start, goal, RouteAlgorithm::Dijkstra, &table).expect("path");
    let alt = shortest_path(&filtered, start, goal, RouteAlgorithm::Alt, &table).expect("path");

    assert!(!alt.contains(&grid_id(5, 2, 2)));
    let expected = route_distance(&filtered, &dijkstra).expect("distance");
    let actual = route_distance(&filtered, &alt).expect("distance");
    assert!((expected - actual).abs() < 1e-6);
}

#[test]
fn stitched_route_visits_waypoints_in_order() {
    let graph = grid_graph(4, 4);
    let table = landmark_table(&graph, 2);
    let waypoints = [grid_id(4, 0, 0), grid_id(4, 3, 3), grid_id(4, 0, 3)];

    let route = stitch_route(&graph, &waypoints, RouteAlgorithm::Alt, &table).expect("route");

    assert_eq!(route.first(), Some(&waypoints[0]));
    assert_eq!(route.last(), Some(&waypoints[2]));
    let middle = route
        .iter()
        .position(|&id| id == waypoints[1])
        .expect("middle waypoint visited");
    assert!(middle > 0 && middle < route.len() - 1);

    // consecutive nodes are always joined by an edge
    assert!(route_distance(&graph, &route).is_ok());
}

#[test]
fn engine_routes_between_coordinates() {
    let graph = Arc::new(grid_graph(4, 4));
    let table = Arc::new(landmark_table(&graph, 2));
    let engine = RoutingEngine::new(Arc::clone(&graph), table);

    let start = graph.node_by_id(grid_id(4, 0, 0)).expect("start");
    let end = graph.node_by_id(grid_id(4, 3, 3)).expect("end");
    let request = RouteRequest::new(vec![
        (start.lat + 0.00001, start.lon),
        (end.lat, end.lon - 0.00001),
    ]);

    let response = engine.compute_route(&request).expect("route");
    assert_eq!(response.algorithm, RouteAlgorithm::Alt);
    assert_eq!(
        response.waypoint_nodes,
        vec![grid_id(4, 0, 0), grid_id(4, 3, 3)]
    );
    assert_eq!(response.hop_count(), 6);
    assert!(response.distance_meters >= 600.0);
    assert_eq!(response.coordinates.len(), 2 * response.hop_count());
}

#[test]
fn engine_avoids_threat_zones() {
    let graph = Arc::new(grid_graph(3, 3));
    let engine = RoutingEngine::new(Arc::clone(&graph), Arc::new(LandmarkTable::empty()));

    let start = graph.node_by_id(grid_id(3, 1, 0)).expect("start");
    let end = graph.node_by_id(grid_id(3, 1, 2)).expect("end");
    let centre = graph.node_by_id(grid_id(3, 1, 1)).expect("centre");

    let request = RouteRequest::new(vec![(start.lat, start.lon), (end.lat, end.lon)])
        .with_algorithm(RouteAlgorithm::Dijkstra)
        .with_threats(vec![ThreatPolygon::around(centre.lat, centre.lon, 0.0002)]);

    let response = engine.compute_route(&request).expect("detour exists");
    assert!(!response.node_path.contains(&centre.id));
    assert_eq!(response.hop_count(), 4);
}

#[test]
fn engine_reports_unreachable_segment() {
    let graph = Arc::new(line_graph());
    let engine = RoutingEngine::new(graph, Arc::new(LandmarkTable::empty()));

    let request = RouteRequest::new(vec![(50.0, 30.0), (50.02, 30.02), (50.0, 30.0)]);
    let error = engine.compute_route(&request).expect_err("line is one-way");
    assert!(matches!(
        error,
        Error::SegmentUnreachable {
            index: 1,
            start: 3,
            goal: 1
        }
    ));
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn shared_state_is_thread_safe() {
    assert_send_sync::<Graph>();
    assert_send_sync::<LandmarkTable>();
    assert_send_sync::<RoutingEngine>();
}

#[test]
fn engine_serves_concurrent_requests() {
    let graph = Arc::new(grid_graph(5, 5));
    let table = Arc::new(landmark_table(&graph, 3));
    let engine = RoutingEngine::new(Arc::clone(&graph), table);

    let trips = [(0, 0, 4, 4), (4, 0, 0, 4), (2, 1, 3, 4), (0, 3, 4, 1)];
    let requests: Vec<RouteRequest> = trips
        .iter()
        .map(|&(row, col, end_row, end_col)| {
            let start = graph.node_by_id(grid_id(5, row, col)).expect("start");
            let end = graph.node_by_id(grid_id(5, end_row, end_col)).expect("end");
            RouteRequest::new(vec![(start.lat, start.lon), (end.lat, end.lon)])
        })
        .collect();
    let expected: Vec<_> = requests
        .iter()
        .map(|request| engine.compute_route(request).expect("route"))
        .collect();

    let (engine, requests) = (&engine, &requests);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(move || {
                    requests
                        .iter()
                        .map(|request| engine.compute_route(request).expect("route"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("worker finished"), expected);
        }
    });
}
