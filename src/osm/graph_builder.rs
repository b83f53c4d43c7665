// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::osm::model::{Element, Way};
use crate::osm::profile::{kmh_to_ms, Profile};
use crate::{earth_distance, Edge, EdgeCost, Error, Graph, Node};

/// Helper object used for storing state related to converting [OSM elements](Element)
/// into a [Graph].
pub(super) struct GraphBuilder<'a> {
    g: &'a mut Graph,
    profile: &'a Profile<'a>,
    skipped_nodes: usize,
    skipped_segments: usize,
}

impl<'a> GraphBuilder<'a> {
    /// Create a new graph builder, adding elements to the provided graph.
    pub(super) fn new(g: &'a mut Graph, profile: &'a Profile<'a>) -> Self {
        Self {
            g,
            profile,
            skipped_nodes: 0,
            skipped_segments: 0,
        }
    }

    /// Add all elements from the provided slice.
    ///
    /// All nodes are added before any way, as Overpass responses commonly
    /// list ways before the nodes they reference.
    pub(super) fn add_elements(&mut self, elements: &[Element]) {
        for e in elements {
            if let Element::Node(n) = e {
                self.add_node(*n);
            }
        }

        for e in elements {
            if let Element::Way(w) = e {
                self.add_way(w);
            }
        }

        if self.skipped_nodes > 0 {
            log::warn!("skipped {} nodes with invalid coordinates", self.skipped_nodes);
        }
        if self.skipped_segments > 0 {
            log::warn!(
                "skipped {} way segments referencing unknown nodes",
                self.skipped_segments
            );
        }
    }

    fn add_node(&mut self, n: Node) {
        if n.lat.is_finite() && n.lon.is_finite() {
            self.g.set_node(n);
        } else {
            log::debug!("node {} has invalid coordinates ({}, {})", n.id, n.lat, n.lon);
            self.skipped_nodes += 1;
        }
    }

    fn add_way(&mut self, w: &Way) {
        let speed = kmh_to_ms(self.profile.way_speed(&w.tags));
        if !(speed.is_finite() && speed > 0.0) {
            log::debug!("way {} has an invalid speed of {} m/s", w.id, speed);
            return;
        }

        let multiplier = self.profile.congestion_factor(&w.tags);
        let (forward, backward) = self.profile.way_direction(&w.tags);

        for pair in w.nodes.windows(2) {
            let (left, right) = match (self.g.get_node(pair[0]), self.g.get_node(pair[1])) {
                (Some(left), Some(right)) => (left, right),
                _ => {
                    log::debug!(
                        "way {} segment {} -> {} references an unknown node",
                        w.id,
                        pair[0],
                        pair[1],
                    );
                    self.skipped_segments += 1;
                    continue;
                }
            };

            let distance = earth_distance(left.lat, left.lon, right.lat, right.lon);
            let cost = EdgeCost {
                time: distance / speed * multiplier,
                distance,
            };

            if forward {
                self.g.set_edge(left.id, Edge { to: right.id, cost });
            }
            if backward {
                self.g.set_edge(right.id, Edge { to: left.id, cost });
            }
        }
    }
}

/// Converts OSM elements into a routing [Graph], as per the provided [Profile].
///
/// Ways referencing unknown nodes only lose the affected segments. If a directed
/// edge is produced by multiple ways, the last one wins.
/// Returns [Error::EmptyGraph] if there are no valid nodes.
pub fn build_graph(elements: &[Element], profile: &Profile) -> Result<Graph, Error> {
    let mut g = Graph::default();
    GraphBuilder::new(&mut g, profile).add_elements(elements);

    if g.is_empty() {
        log::warn!("no usable nodes among {} OSM elements", elements.len());
        return Err(Error::EmptyGraph);
    }

    log::info!(
        "built graph with {} nodes and {} edges using the {} profile",
        g.len(),
        g.edge_count(),
        profile.name,
    );
    Ok(g)
}
