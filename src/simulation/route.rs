//! Drive-through lane and the route every customer follows
//!
//! A `LaneNetwork` is the lane graph of the lot (entry, menu board, order
//! window, exit, bypass lanes). Planning through it yields a `Route`: the
//! immutable waypoint list that vehicles share.

use anyhow::{bail, Context, Result};
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::types::Position;

/// Edge data for the lane graph
#[derive(Debug, Clone, Copy)]
pub struct LaneEdge {
    pub weight: u32, // Lane length scaled for integer weights
}

impl LaneEdge {
    fn between(start: &Position, end: &Position) -> Self {
        // Scaled by 100 to preserve precision
        let weight = (start.distance(end) * 100.0) as u32;
        Self {
            weight: weight.max(1),
        }
    }
}

/// Directed graph of lane waypoints
#[derive(Default)]
pub struct LaneNetwork {
    graph: DiGraph<Position, LaneEdge>,
}

impl LaneNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a waypoint node and returns its handle
    pub fn add_waypoint(&mut self, position: Position) -> NodeIndex {
        self.graph.add_node(position)
    }

    /// Connects two waypoints with a one-way lane
    pub fn connect(&mut self, from: NodeIndex, to: NodeIndex) -> Result<()> {
        let start = *self
            .graph
            .node_weight(from)
            .context("Lane start waypoint not found")?;
        let end = *self
            .graph
            .node_weight(to)
            .context("Lane end waypoint not found")?;
        self.graph.add_edge(from, to, LaneEdge::between(&start, &end));
        Ok(())
    }

    pub fn waypoint_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn lane_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Shortest path between two waypoints, start included
    pub fn find_path(&self, start: NodeIndex, end: NodeIndex) -> Option<Vec<NodeIndex>> {
        astar(
            &self.graph,
            start,
            |node| node == end,
            |edge| edge.weight().weight,
            |_| 0, // Null heuristic = Dijkstra
        )
        .map(|(_, path)| path)
    }

    /// Plans entry -> order window -> exit. The entry waypoint becomes the spawn point.
    pub fn plan_route(
        &self,
        entry: NodeIndex,
        order_window: NodeIndex,
        exit: NodeIndex,
    ) -> Result<Route> {
        if entry == order_window {
            bail!("Order window cannot be the lane entry");
        }

        let approach = self
            .find_path(entry, order_window)
            .context("No lane from entry to order window")?;
        let departure = self
            .find_path(order_window, exit)
            .context("No lane from order window to exit")?;

        let spawn_point = *self
            .graph
            .node_weight(entry)
            .context("Entry waypoint not found")?;

        let nodes: Vec<NodeIndex> = approach
            .iter()
            .skip(1)
            .chain(departure.iter().skip(1))
            .copied()
            .collect();
        let waypoints = nodes
            .iter()
            .map(|node| {
                self.graph
                    .node_weight(*node)
                    .copied()
                    .context("Path waypoint not found")
            })
            .collect::<Result<Vec<_>>>()?;

        // approach includes the entry node, which is not a waypoint
        let order_waypoint = approach.len() - 2;

        Route::new(spawn_point, waypoints, order_waypoint)
    }

    /// Outgoing lanes from a waypoint (used when drawing the lot)
    pub fn lanes_from(&self, node: NodeIndex) -> Vec<(NodeIndex, u32)> {
        self.graph
            .edges(node)
            .map(|edge| (edge.target(), edge.weight().weight))
            .collect()
    }
}

/// An ordered, immutable sequence of waypoints shared by every vehicle
#[derive(Debug, Clone)]
pub struct Route {
    spawn_point: Position,
    waypoints: Vec<Position>,
    order_waypoint: usize,
    /// Length of segment `i`, which ends at `waypoints[i]`
    segment_lengths: Vec<f32>,
    segment_weight: f32,
}

impl Route {
    pub fn new(spawn_point: Position, waypoints: Vec<Position>, order_waypoint: usize) -> Result<Self> {
        if waypoints.is_empty() {
            bail!("Route needs at least one waypoint");
        }
        if order_waypoint >= waypoints.len() {
            bail!(
                "Order waypoint {} outside route of {} waypoints",
                order_waypoint,
                waypoints.len()
            );
        }

        let segment_lengths: Vec<f32> = std::iter::once(&spawn_point)
            .chain(waypoints.iter())
            .zip(waypoints.iter())
            .map(|(from, to)| from.planar_distance(to))
            .collect();

        // Any segment fits inside one weight, which keeps progress monotonic
        let segment_weight = segment_lengths
            .iter()
            .copied()
            .fold(0.0_f32, f32::max)
            .max(1e-3);

        Ok(Self {
            spawn_point,
            waypoints,
            order_waypoint,
            segment_lengths,
            segment_weight,
        })
    }

    /// The default lot: a straight approach to the window, then a curve out
    /// to the exit. A bypass lane skips the window and is never planned.
    pub fn drive_thru_loop() -> Result<Self> {
        let mut lanes = LaneNetwork::new();
        let entry = lanes.add_waypoint(Position::new(-12.0, 0.0, 0.0));
        let queue_start = lanes.add_waypoint(Position::new(-8.0, 0.0, 0.0));
        let menu_board = lanes.add_waypoint(Position::new(-4.0, 0.0, 0.0));
        let window = lanes.add_waypoint(Position::new(0.0, 0.0, 0.0));
        let pull_out = lanes.add_waypoint(Position::new(4.0, 0.0, 0.0));
        let curve = lanes.add_waypoint(Position::new(8.0, 0.0, 2.0));
        let exit = lanes.add_waypoint(Position::new(10.0, 0.0, 6.0));
        let bypass = lanes.add_waypoint(Position::new(-2.0, 0.0, -6.0));

        lanes.connect(entry, queue_start)?;
        lanes.connect(queue_start, menu_board)?;
        lanes.connect(menu_board, window)?;
        lanes.connect(window, pull_out)?;
        lanes.connect(pull_out, curve)?;
        lanes.connect(curve, exit)?;
        lanes.connect(queue_start, bypass)?;
        lanes.connect(bypass, pull_out)?;

        lanes.plan_route(entry, window, exit)
    }

    pub fn spawn_point(&self) -> Position {
        self.spawn_point
    }

    pub fn waypoint(&self, index: usize) -> Option<&Position> {
        self.waypoints.get(index)
    }

    pub fn waypoints(&self) -> &[Position] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.waypoints.len() - 1
    }

    pub fn order_waypoint(&self) -> usize {
        self.order_waypoint
    }

    /// Where segment `index` starts: the spawn point for the first segment
    pub fn segment_start(&self, index: usize) -> Option<Position> {
        match index {
            0 => Some(self.spawn_point),
            i => self.waypoints.get(i - 1).copied(),
        }
    }

    pub fn segment_length(&self, index: usize) -> Option<f32> {
        self.segment_lengths.get(index).copied()
    }

    pub fn segment_weight(&self) -> f32 {
        self.segment_weight
    }

    /// Route progress for a vehicle heading to `waypoint_index` that has
    /// covered `within_segment` of that segment
    pub fn progress(&self, waypoint_index: usize, within_segment: f32) -> f32 {
        waypoint_index as f32 * self.segment_weight + within_segment.min(self.segment_weight)
    }
}
