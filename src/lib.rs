// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Shortest paths over [OpenStreetMap](https://www.openstreetmap.org/) road data,
//! together with a step-by-step exploration trace suitable for animating the search.
//!
//! Raw map elements (nodes and ways, as returned by Overpass or stored in OSM XML files)
//! are converted into a weighted directed [Graph] where every edge carries both its
//! travel time and its length. Interpretation of road tags is customizable via
//! [profiles](crate::osm::Profile). Endpoints are snapped to the road network with a
//! [GridIndex], and routes are found by an A* search running in an isolated,
//! cancellable [SearchWorker].
//!
//! Upstream results which are expensive to obtain (geocoded addresses and downloaded
//! road data) can be kept in a [CacheManager](cache::CacheManager).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! let elements = roadtrace::osm::elements_from_file(
//!     "path/to/monaco.json",
//!     roadtrace::osm::FileFormat::Unknown,
//! ).expect("failed to load monaco.json");
//! let g = roadtrace::osm::build_graph(&elements, &roadtrace::osm::CAR_PROFILE)
//!     .expect("no roads in monaco.json");
//!
//! let start = roadtrace::Coord::new(43.7384, 7.4246);
//! let end = roadtrace::Coord::new(43.7478, 7.4323);
//! let bounds = roadtrace::Bounds::around(start, end).pad(0.2);
//!
//! let route = roadtrace::route_between(
//!     Arc::new(g),
//!     bounds,
//!     start,
//!     end,
//!     roadtrace::CostMode::Time,
//!     &roadtrace::osm::CAR_PROFILE,
//! ).expect("failed to find route");
//!
//! println!("{:.0} s, {:.0} m", route.cost.time, route.cost.distance);
//! ```

mod astar;
mod bounds;
pub mod cache;
mod distance;
mod error;
mod graph;
pub mod osm;
mod route;
mod spatial;
mod worker;

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

pub use astar::{
    find_route, find_route_cancellable, AStarError, CostMode, EdgeVisit, Route, SearchOptions,
    Trace, TRACE_BATCH_SIZE,
};
pub use bounds::Bounds;
pub use distance::earth_distance;
pub use error::Error;
pub use graph::Graph;
pub use route::{attempt_padding, route_between, search_bounds};
pub use spatial::{GridIndex, DEFAULT_GRID_SIZE, MAX_SNAP_DISTANCE};
pub use worker::{SearchRequest, SearchWorker};

/// A position on Earth, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to another position, in meters.
    pub fn distance_to(&self, other: Coord) -> f64 {
        earth_distance(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Represents an element of the [Graph].
///
/// Outgoing edges are kept by the graph alongside the node, see [Graph::get_edges].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    pub fn coord(&self) -> Coord {
        Coord::new(self.lat, self.lon)
    }
}

/// Cost of traversing a single directed edge, or a sum of such costs along a route.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeCost {
    /// Travel time, in seconds.
    pub time: f64,

    /// Length, in meters.
    pub distance: f64,
}

impl EdgeCost {
    pub const ZERO: Self = Self {
        time: 0.0,
        distance: 0.0,
    };

    /// Returns the component of the cost minimized by the given [CostMode].
    pub fn get(&self, mode: CostMode) -> f64 {
        match mode {
            CostMode::Time => self.time,
            CostMode::Distance => self.distance,
        }
    }
}

impl Add for EdgeCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            time: self.time + rhs.time,
            distance: self.distance + rhs.distance,
        }
    }
}

impl AddAssign for EdgeCost {
    fn add_assign(&mut self, rhs: Self) {
        self.time += rhs.time;
        self.distance += rhs.distance;
    }
}

impl Sum for EdgeCost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Represents an outgoing (one-way) connection from a specific [Node].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: i64,
    pub cost: EdgeCost,
}
