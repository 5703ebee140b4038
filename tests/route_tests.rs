//! Lane network and route tests

use drive_thru_sim::simulation::{LaneNetwork, Position, Route};

#[test]
fn test_drive_thru_loop_layout() {
    let route = Route::drive_thru_loop().unwrap();

    assert_eq!(route.spawn_point(), Position::new(-12.0, 0.0, 0.0));
    assert_eq!(route.len(), 6);
    assert_eq!(route.order_waypoint(), 2);
    assert_eq!(
        route.waypoint(route.order_waypoint()),
        Some(&Position::new(0.0, 0.0, 0.0))
    );
    assert_eq!(route.waypoint(route.last_index()), Some(&Position::new(10.0, 0.0, 6.0)));

    // The bypass skips the window, so it is never planned
    assert!(!route
        .waypoints()
        .contains(&Position::new(-2.0, 0.0, -6.0)));
}

#[test]
fn test_segments_and_progress() {
    let route = Route::drive_thru_loop().unwrap();

    assert_eq!(route.segment_start(0), Some(route.spawn_point()));
    assert_eq!(route.segment_start(1), route.waypoint(0).copied());
    assert_eq!(route.segment_length(0), Some(4.0));

    for i in 0..route.len() {
        let length = route.segment_length(i).unwrap();
        assert!(length <= route.segment_weight());
        // The end of one segment never outranks the start of the next
        assert!(route.progress(i, length) <= route.progress(i + 1, 0.0));
    }
    assert!(route.segment_length(route.len()).is_none());
}

#[test]
fn test_find_path_prefers_shorter_lanes() {
    let mut lanes = LaneNetwork::new();
    let a = lanes.add_waypoint(Position::new(0.0, 0.0, 0.0));
    let b = lanes.add_waypoint(Position::new(10.0, 0.0, 0.0));
    let detour = lanes.add_waypoint(Position::new(5.0, 0.0, 20.0));
    let shortcut = lanes.add_waypoint(Position::new(5.0, 0.0, 1.0));

    lanes.connect(a, detour).unwrap();
    lanes.connect(detour, b).unwrap();
    lanes.connect(a, shortcut).unwrap();
    lanes.connect(shortcut, b).unwrap();

    assert_eq!(lanes.waypoint_count(), 4);
    assert_eq!(lanes.lane_count(), 4);
    assert_eq!(lanes.find_path(a, b), Some(vec![a, shortcut, b]));
    assert_eq!(lanes.find_path(b, a), None);
    assert_eq!(lanes.lanes_from(a).len(), 2);
}

#[test]
fn test_plan_route_marks_order_window() {
    let mut lanes = LaneNetwork::new();
    let entry = lanes.add_waypoint(Position::new(0.0, 0.0, 0.0));
    let window = lanes.add_waypoint(Position::new(3.0, 0.0, 0.0));
    let exit = lanes.add_waypoint(Position::new(6.0, 0.0, 0.0));
    lanes.connect(entry, window).unwrap();
    lanes.connect(window, exit).unwrap();

    let route = lanes.plan_route(entry, window, exit).unwrap();
    assert_eq!(route.spawn_point(), Position::new(0.0, 0.0, 0.0));
    assert_eq!(route.len(), 2);
    assert_eq!(route.order_waypoint(), 0);
}

#[test]
fn test_plan_route_rejects_bad_layouts() {
    let mut lanes = LaneNetwork::new();
    let entry = lanes.add_waypoint(Position::new(0.0, 0.0, 0.0));
    let window = lanes.add_waypoint(Position::new(3.0, 0.0, 0.0));
    let exit = lanes.add_waypoint(Position::new(6.0, 0.0, 0.0));
    lanes.connect(entry, window).unwrap();

    // No lane out of the window
    assert!(lanes.plan_route(entry, window, exit).is_err());
    assert!(lanes.plan_route(entry, entry, exit).is_err());
}

#[test]
fn test_route_new_validates() {
    let spawn = Position::default();
    assert!(Route::new(spawn, Vec::new(), 0).is_err());
    assert!(Route::new(spawn, vec![Position::new(1.0, 0.0, 0.0)], 1).is_err());
    assert!(Route::new(spawn, vec![Position::new(1.0, 0.0, 0.0)], 0).is_ok());
}
