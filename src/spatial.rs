// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{earth_distance, Bounds, Error, Graph, Node};

/// Number of cells along each axis of a [GridIndex] built with [GridIndex::new].
pub const DEFAULT_GRID_SIZE: usize = 100;

/// Maximum distance, in meters, between a position and the node it snaps to.
/// Positions further away from every node are considered to be off the road network.
pub const MAX_SNAP_DISTANCE: f64 = 20_000.0;

/// GridIndex speeds up nearest-node lookups by bucketing [Nodes](Node) into a fixed,
/// uniform grid spanning a bounding box. A lookup only considers the nodes from the
/// 3×3 block of cells around the queried position.
///
/// Nodes outside of the bounding box are clamped into the border cells. If the
/// bounding box has no area, or a lookup finds no candidates in its neighborhood,
/// the index falls back to considering every node. Frequent fallbacks
/// (see [GridIndex::fallback_count]) indicate that the grid is too fine for the
/// density of the data.
#[derive(Debug)]
pub struct GridIndex {
    bounds: Bounds,
    size: usize,
    lat_cell: f64,
    lon_cell: f64,
    degenerate: bool,
    cells: Vec<Vec<Node>>,
    nodes: Vec<Node>,
    fallbacks: AtomicUsize,
}

impl GridIndex {
    /// Builds a [DEFAULT_GRID_SIZE] × [DEFAULT_GRID_SIZE] index over all nodes of a graph.
    pub fn new(g: &Graph, bounds: Bounds) -> Self {
        Self::with_grid_size(g, bounds, DEFAULT_GRID_SIZE)
    }

    /// Builds a `size` × `size` index over all nodes of a graph.
    pub fn with_grid_size(g: &Graph, bounds: Bounds, size: usize) -> Self {
        Self::from_nodes(g.iter().copied(), bounds, size)
    }

    /// Builds a `size` × `size` index over an arbitrary set of nodes.
    pub fn from_nodes<I: IntoIterator<Item = Node>>(nodes: I, bounds: Bounds, size: usize) -> Self {
        let size = size.max(1);
        let nodes: Vec<Node> = nodes.into_iter().collect();
        let lat_cell = bounds.lat_span() / size as f64;
        let lon_cell = bounds.lon_span() / size as f64;
        let degenerate = !(lat_cell > 0.0 && lon_cell > 0.0);

        let mut index = Self {
            bounds,
            size,
            lat_cell,
            lon_cell,
            degenerate,
            cells: Vec::default(),
            nodes,
            fallbacks: AtomicUsize::new(0),
        };

        if degenerate {
            log::debug!("spatial index over degenerate bounds {bounds:?} - every lookup scans all nodes");
        } else {
            let mut cells = vec![Vec::default(); size * size];
            for &node in &index.nodes {
                let (x, y) = index.cell_of(node.lat, node.lon);
                cells[x * size + y].push(node);
            }
            index.cells = cells;
        }

        index
    }

    /// Returns the number of indexed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Returns how many lookups had to fall back to scanning every node.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Returns the (clamped) cell coordinates of a position.
    fn cell_of(&self, lat: f64, lon: f64) -> (usize, usize) {
        (
            clamp_cell((lat - self.bounds.south) / self.lat_cell, self.size),
            clamp_cell((lon - self.bounds.west) / self.lon_cell, self.size),
        )
    }

    /// Returns the candidate nodes for a position: all nodes from the 3×3 block
    /// of cells around the position, or all nodes if that block is empty.
    pub fn nearby_nodes(&self, lat: f64, lon: f64) -> Cow<'_, [Node]> {
        if self.degenerate {
            return Cow::Borrowed(self.nodes.as_slice());
        }

        let (x, y) = self.cell_of(lat, lon);
        let mut candidates = Vec::default();

        for nx in x.saturating_sub(1)..=(x + 1).min(self.size - 1) {
            for ny in y.saturating_sub(1)..=(y + 1).min(self.size - 1) {
                candidates.extend_from_slice(&self.cells[nx * self.size + ny]);
            }
        }

        if candidates.is_empty() {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
            log::debug!("no nodes in the neighborhood of ({lat}, {lon}) - scanning all nodes");
            Cow::Borrowed(self.nodes.as_slice())
        } else {
            Cow::Owned(candidates)
        }
    }

    /// Finds the closest [Node] to the given position among the [nearby nodes](GridIndex::nearby_nodes).
    ///
    /// Returns `None` if there are no nodes, or if the closest one is further
    /// than [MAX_SNAP_DISTANCE] away.
    pub fn find_nearest_node(&self, lat: f64, lon: f64) -> Option<Node> {
        let (nearest, distance) = self
            .nearby_nodes(lat, lon)
            .iter()
            .map(|&nd| (nd, earth_distance(lat, lon, nd.lat, nd.lon)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))?;

        if distance > MAX_SNAP_DISTANCE {
            log::warn!(
                "no road node within {MAX_SNAP_DISTANCE} m of ({lat}, {lon}), closest is {distance:.0} m away"
            );
            None
        } else {
            Some(nearest)
        }
    }

    /// Like [GridIndex::find_nearest_node], but reports failure as [Error::NodeSnapFailed].
    pub fn snap(&self, lat: f64, lon: f64) -> Result<Node, Error> {
        self.find_nearest_node(lat, lon)
            .ok_or(Error::NodeSnapFailed { lat, lon })
    }
}

#[inline]
fn clamp_cell(offset: f64, size: usize) -> usize {
    // Float-to-int casts saturate, and NaN becomes 0
    (offset.floor().max(0.0) as usize).min(size - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> Vec<Node> {
        [
            (1, 0.01, 0.01),
            (2, 0.01, 0.05),
            (3, 0.03, 0.09),
            (4, 0.04, 0.03),
            (5, 0.04, 0.07),
            (6, 0.07, 0.03),
            (7, 0.07, 0.01),
            (8, 0.08, 0.05),
            (9, 0.08, 0.09),
        ]
        .into_iter()
        .map(|(id, lat, lon)| Node { id, lat, lon })
        .collect()
    }

    fn index(size: usize) -> GridIndex {
        // Offset so that no node lies on a cell border of the 10x10 grid
        GridIndex::from_nodes(nodes(), Bounds::new(-0.005, -0.005, 0.095, 0.095), size)
    }

    #[test]
    fn every_node_in_exactly_one_cell() {
        let idx = GridIndex::from_nodes(
            nodes(),
            Bounds::new(0.02, 0.02, 0.06, 0.06), // some nodes lie outside
            10,
        );
        let mut ids: Vec<i64> = idx.cells.iter().flatten().map(|n| n.id).collect();
        ids.sort();
        assert_eq!(ids, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn find_nearest_node() {
        for size in [1, 10, 100] {
            let idx = index(size);
            assert_eq!(idx.find_nearest_node(0.02, 0.02).unwrap().id, 1);
            assert_eq!(idx.find_nearest_node(0.05, 0.03).unwrap().id, 4);
            assert_eq!(idx.find_nearest_node(0.05, 0.08).unwrap().id, 5);
            assert_eq!(idx.find_nearest_node(0.09, 0.06).unwrap().id, 8);
        }
    }

    #[test]
    fn nearby_nodes_only_neighborhood() {
        let idx = index(10);
        let mut ids: Vec<i64> = idx.nearby_nodes(0.012, 0.012).iter().map(|n| n.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1]);
        assert_eq!(idx.fallback_count(), 0);
    }

    #[test]
    fn empty_neighborhood_falls_back_to_all_nodes() {
        let idx = index(100);
        assert_eq!(idx.nearby_nodes(0.055, 0.055).len(), 9);
        assert_eq!(idx.fallback_count(), 1);
    }

    #[test]
    fn degenerate_bounds() {
        let idx = GridIndex::from_nodes(nodes(), Bounds::new(0.05, 0.0, 0.05, 0.1), 100);
        assert_eq!(idx.nearby_nodes(0.05, 0.05).len(), 9);
        assert_eq!(idx.find_nearest_node(0.09, 0.06).unwrap().id, 8);
    }

    #[test]
    fn query_outside_bounds_is_clamped() {
        let idx = index(10);
        assert_eq!(idx.find_nearest_node(-0.01, -0.01).unwrap().id, 1);
        assert_eq!(idx.find_nearest_node(0.2, 0.2).unwrap().id, 9);
    }

    #[test]
    fn snap_cutoff() {
        // 1° of latitude is ~111 195 m, thus 0.1798° is ~19 993 m and 0.18° is ~20 015 m
        let node = Node { id: 1, lat: 0.0, lon: 0.0 };
        let idx = GridIndex::from_nodes([node], Bounds::new(-1.0, -1.0, 1.0, 1.0), 100);

        assert_eq!(idx.find_nearest_node(0.1798, 0.0), Some(node));
        assert_eq!(idx.find_nearest_node(0.18, 0.0), None);
        assert_eq!(
            idx.snap(0.18, 0.0),
            Err(Error::NodeSnapFailed { lat: 0.18, lon: 0.0 })
        );
    }

    #[test]
    fn empty_index() {
        let idx = GridIndex::from_nodes([], Bounds::new(0.0, 0.0, 1.0, 1.0), 100);
        assert!(idx.is_empty());
        assert_eq!(idx.find_nearest_node(0.5, 0.5), None);
    }
}
