// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use super::trace::{Trace, TraceRecorder, TRACE_BATCH_SIZE};
use crate::{earth_distance, AStarError, Coord, Edge, EdgeCost, Graph, Node};

/// Which component of [EdgeCost] a search minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum CostMode {
    /// Minimize travel time.
    Time,

    /// Minimize travelled distance.
    Distance,
}

impl FromStr for CostMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(Self::Time),
            "distance" => Ok(Self::Distance),
            _ => Err(format!("unknown cost mode: {s:?}")),
        }
    }
}

impl std::fmt::Display for CostMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Distance => write!(f, "distance"),
        }
    }
}

/// Parameters of a single route search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub mode: CostMode,

    /// Upper bound on the speed (in meters per second) at which any edge of the graph
    /// is traversed. In [CostMode::Time] the remaining distance is divided by this
    /// value, and an underestimated bound makes the heuristic overestimate, which
    /// breaks optimality of the returned routes. Ignored in [CostMode::Distance].
    pub max_speed: f64,

    /// Number of explored edges in a single batch of the [Trace].
    pub batch_size: usize,
}

impl SearchOptions {
    pub fn new(mode: CostMode, max_speed: f64) -> Self {
        Self {
            mode,
            max_speed,
            batch_size: TRACE_BATCH_SIZE,
        }
    }

    fn heuristic_divisor(&self) -> Result<f64, AStarError> {
        match self.mode {
            CostMode::Distance => Ok(1.0),
            CostMode::Time if self.max_speed.is_finite() && self.max_speed > 0.0 => {
                Ok(self.max_speed)
            }
            CostMode::Time => Err(AStarError::InvalidSpeedBound(self.max_speed)),
        }
    }
}

/// Result of a successful search.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Nodes along the route, from the start to the end (inclusive).
    pub path: Vec<Node>,

    /// Total travel time and distance along the route.
    pub cost: EdgeCost,

    /// All edges explored by the search, in the order of exploration.
    pub trace: Trace,
}

impl Route {
    pub fn coords(&self) -> Vec<Coord> {
        self.path.iter().map(Node::coord).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: i64,
    cost: f64,
    score: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.score.total_cmp(&self.score)
    }
}

fn reconstruct_path(came_from: &HashMap<i64, i64>, mut last: i64) -> Vec<i64> {
    let mut path = vec![last];

    while let Some(&nd) = came_from.get(&last) {
        path.push(nd);
        last = nd;
    }

    path.reverse();
    path
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find the cheapest route between two nodes in the provided graph.
///
/// See [find_route_cancellable].
pub fn find_route(
    g: &Graph,
    from_id: i64,
    to_id: i64,
    options: &SearchOptions,
) -> Result<Route, AStarError> {
    find_route_cancellable(g, from_id, to_id, options, &AtomicBool::new(false))
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find the cheapest route between two nodes in the provided graph,
/// as measured by [SearchOptions::mode].
///
/// The crow-flies distance to the end node is used as the heuristic;
/// in [CostMode::Time] it is divided by [SearchOptions::max_speed].
///
/// Every expanded node (except for the start) is recorded in the route's [Trace]
/// together with the node it was reached from. If the end node is unreachable,
/// [AStarError::NoRoute] carries the trace of the whole search.
///
/// The search is aborted with [AStarError::Cancelled] as soon as `cancel` is set.
pub fn find_route_cancellable(
    g: &Graph,
    from_id: i64,
    to_id: i64,
    options: &SearchOptions,
    cancel: &AtomicBool,
) -> Result<Route, AStarError> {
    let divisor = options.heuristic_divisor()?;
    let to_node = g
        .get_node(to_id)
        .ok_or(AStarError::InvalidReference(to_id))?;
    let from_node = g
        .get_node(from_id)
        .ok_or(AStarError::InvalidReference(from_id))?;

    let heuristic =
        |n: &Node| earth_distance(n.lat, n.lon, to_node.lat, to_node.lon) / divisor;

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<i64, i64> = HashMap::default();
    let mut known_costs: HashMap<i64, f64> = HashMap::default();
    let mut closed: HashSet<i64> = HashSet::default();
    let mut trace = TraceRecorder::new(options.batch_size);

    queue.push(QueueItem {
        at: from_id,
        cost: 0.0,
        score: heuristic(&from_node),
    });
    known_costs.insert(from_id, 0.0);

    while let Some(item) = queue.pop() {
        if cancel.load(Ordering::Relaxed) {
            return Err(AStarError::Cancelled);
        }

        // The queue may contain multiple items for the same node;
        // only the cheapest one is expanded.
        if closed.contains(&item.at)
            || item.cost > known_costs.get(&item.at).cloned().unwrap_or(f64::INFINITY)
        {
            continue;
        }

        if item.at == to_id {
            let ids = reconstruct_path(&came_from, to_id);
            let cost = g.path_cost(&ids).unwrap_or_default();
            let path = ids.into_iter().filter_map(|id| g.get_node(id)).collect();
            return Ok(Route {
                path,
                cost,
                trace: trace.finish(),
            });
        }

        closed.insert(item.at);
        let Some(current) = g.get_node(item.at) else {
            continue;
        };

        if let Some(parent) = came_from.get(&item.at).and_then(|&id| g.get_node(id)) {
            trace.record(parent.coord(), current.coord());
        }

        for &Edge {
            to: neighbor_id,
            cost: edge_cost,
        } in g.get_edges(item.at)
        {
            if closed.contains(&neighbor_id) {
                continue;
            }

            // Check if the referred node exists
            if let Some(neighbor) = g.get_node(neighbor_id) {
                // Check if this is the cheapest way to the neighbor
                let neighbor_cost = item.cost + edge_cost.get(options.mode);
                if neighbor_cost
                    >= known_costs
                        .get(&neighbor_id)
                        .cloned()
                        .unwrap_or(f64::INFINITY)
                {
                    continue;
                }

                // Push the new item into the queue
                came_from.insert(neighbor_id, item.at);
                known_costs.insert(neighbor_id, neighbor_cost);
                queue.push(QueueItem {
                    at: neighbor_id,
                    cost: neighbor_cost,
                    score: neighbor_cost + heuristic(&neighbor),
                });
            }
        }
    }

    Err(AStarError::NoRoute(trace.finish()))
}
