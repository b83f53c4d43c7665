// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::Trace;

/// Error conditions which may occur during [find_route](crate::find_route) or
/// [find_route_cancellable](crate::find_route_cancellable).
#[derive(Debug, Clone, PartialEq)]
pub enum AStarError {
    /// The start or end nodes don't exist in a graph.
    InvalidReference(i64),

    /// The speed bound used by the time heuristic is not a positive, finite number.
    InvalidSpeedBound(f64),

    /// Every node reachable from the start was expanded without reaching the end.
    /// Carries the exploration trace accumulated until then.
    NoRoute(Trace),

    /// The search was aborted by its caller.
    Cancelled,
}

impl std::fmt::Display for AStarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidReference(node_id) => write!(f, "invalid node: {}", node_id),
            Self::InvalidSpeedBound(speed) => write!(f, "invalid speed bound: {} m/s", speed),
            Self::NoRoute(trace) => write!(f, "no route after exploring {} edges", trace.len()),
            Self::Cancelled => write!(f, "search cancelled"),
        }
    }
}

impl std::error::Error for AStarError {}
