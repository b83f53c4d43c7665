// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::osm::Profile;
use crate::{
    Bounds, Coord, CostMode, Error, Graph, GridIndex, Route, SearchOptions, SearchRequest,
    SearchWorker,
};

/// Direct distance (in meters) above which a trip is considered long.
const LONG_TRIP_DISTANCE: f64 = 75_000.0;

/// Returns the ratio by which the [box around the endpoints](Bounds::around) should be
/// [padded](Bounds::pad) when requesting road data for a trip of the given crow-flies length.
///
/// Long trips get a relatively smaller margin. `retry` should be set after an attempt
/// failed with a [retryable](Error::is_retryable) error, and gives a larger margin.
pub fn attempt_padding(direct_distance: f64, retry: bool) -> f64 {
    let long = direct_distance > LONG_TRIP_DISTANCE;
    match (long, retry) {
        (true, false) => 0.1,
        (false, false) => 0.2,
        (true, true) => 0.4,
        (false, true) => 0.5,
    }
}

/// Returns the area of road data needed to route between two positions,
/// see [attempt_padding].
pub fn search_bounds(start: Coord, end: Coord, retry: bool) -> Bounds {
    Bounds::around(start, end).pad(attempt_padding(start.distance_to(end), retry))
}

/// Finds the cheapest route between two arbitrary positions.
///
/// Both positions are snapped to the nearest nodes of the graph using a [GridIndex]
/// spanning `bounds`, and the search runs on a [SearchWorker]. The speed bound used by
/// the time heuristic is the higher of the profile's fastest road class and the
/// fastest edge actually present in the graph.
pub fn route_between(
    graph: Arc<Graph>,
    bounds: Bounds,
    start: Coord,
    end: Coord,
    mode: CostMode,
    profile: &Profile,
) -> Result<Route, Error> {
    if graph.is_empty() {
        return Err(Error::EmptyGraph);
    }

    let index = GridIndex::new(&graph, bounds);
    let start_node = index.snap(start.lat, start.lon)?;
    let end_node = index.snap(end.lat, end.lon)?;
    log::debug!(
        "snapped ({}, {}) to node {} and ({}, {}) to node {}",
        start.lat,
        start.lon,
        start_node.id,
        end.lat,
        end.lon,
        end_node.id,
    );

    let max_speed = profile.max_speed_ms().max(graph.max_speed());
    let request = SearchRequest {
        graph,
        start: start_node.id,
        end: end_node.id,
        options: SearchOptions::new(mode, max_speed),
    };

    SearchWorker::spawn(request)?.wait()
}
