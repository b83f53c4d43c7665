// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod error;
mod search;
mod trace;

pub use error::AStarError;
pub use search::{find_route, find_route_cancellable, CostMode, Route, SearchOptions};
pub use trace::{EdgeVisit, Trace, TRACE_BATCH_SIZE};
