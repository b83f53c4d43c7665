// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Trace;

/// Reasons why a route could not be produced.
///
/// [Error::NodeSnapFailed] and [Error::PathNotFound] usually mean that the road data
/// covers too small an area; see [Error::is_retryable].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The map data contained no usable nodes, so no route is possible.
    #[error("failed to build road graph: the map data is empty or invalid")]
    EmptyGraph,

    /// There is no road node close enough to the given position.
    #[error("could not find a road near ({lat}, {lon})")]
    NodeSnapFailed { lat: f64, lon: f64 },

    /// The search explored every reachable node without reaching the destination.
    /// Carries the exploration trace accumulated until then.
    #[error("no path could be found")]
    PathNotFound { explored: Trace },

    /// The search could not be carried out, e.g. due to malformed input
    /// or a crash of the search worker.
    #[error("route search failed: {0}")]
    SearchFailed(String),
}

impl Error {
    /// Checks if repeating the attempt with road data covering a larger area
    /// may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NodeSnapFailed { .. } | Self::PathNotFound { .. } => true,
            Self::EmptyGraph | Self::SearchFailed(_) => false,
        }
    }
}
