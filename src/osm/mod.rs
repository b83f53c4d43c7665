// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod graph_builder;
mod model;
mod profile;
mod reader;

pub use graph_builder::build_graph;
pub use model::{merge_elements, Element, ElementType, Way};
pub use profile::{kmh_to_ms, parse_maxspeed, Profile, Speed, CAR_PROFILE};
pub use reader::{elements_from_buffer, elements_from_file, elements_from_io, FileFormat, ReadError};
