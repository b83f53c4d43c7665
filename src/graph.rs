// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Bounds, Edge, EdgeCost, Node};
use std::collections::btree_map::{BTreeMap, Entry};

/// Represents a road network as a set of [Nodes](Node)
/// and directed [Edges](Edge) between them.
///
/// Once built, a graph is only read. Route searches keep their own state
/// keyed by node id, so a single graph can be shared (e.g. behind an
/// [Arc](std::sync::Arc)) by any number of concurrent searches.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph(BTreeMap<i64, (Node, Vec<Edge>)>);

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.0.values().map(|(node, _)| node)
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.0.get(&id).map(|&(node, _)| node)
    }

    /// Creates or updates a [Node] with `node.id`.
    ///
    /// All outgoing and incoming edges are preserved. Moving an existing node
    /// does not recompute the cost of its edges.
    pub fn set_node(&mut self, node: Node) {
        match self.0.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert((node, Vec::default()));
            }
            Entry::Occupied(mut e) => {
                debug_assert_eq!(e.get().0.id, node.id);
                e.get_mut().0 = node;
            }
        }
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id.
    pub fn get_edges(&self, from_id: i64) -> &[Edge] {
        self.0
            .get(&from_id)
            .map(|(_, e)| e.as_slice())
            .unwrap_or_default()
    }

    /// Gets the cost of an [Edge] from one node to another, if such an edge exists.
    pub fn get_edge(&self, from_id: i64, to_id: i64) -> Option<EdgeCost> {
        self.get_edges(from_id)
            .iter()
            .find(|edge| edge.to == to_id)
            .map(|edge| edge.cost)
    }

    /// Creates or updates an [Edge] from a node with a given id.
    ///
    /// An existing edge between the same ordered pair of nodes is overwritten,
    /// thus the last inserted cost wins. Edges starting or ending at nodes which
    /// are not in the graph are ignored; returns whether the edge was stored.
    pub fn set_edge(&mut self, from_id: i64, edge: Edge) -> bool {
        if !self.0.contains_key(&edge.to) {
            return false;
        }

        match self.0.get_mut(&from_id) {
            Some((_, edges)) => {
                if let Some(candidate) = edges.iter_mut().find(|e| e.to == edge.to) {
                    *candidate = edge;
                } else {
                    edges.push(edge);
                }
                true
            }
            None => false,
        }
    }

    /// Returns the total number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.0.values().map(|(_, edges)| edges.len()).sum()
    }

    /// Sums the costs of consecutive edges along a sequence of node ids.
    /// Returns `None` if any two consecutive nodes are not connected.
    pub fn path_cost(&self, path: &[i64]) -> Option<EdgeCost> {
        path.windows(2)
            .map(|pair| self.get_edge(pair[0], pair[1]))
            .sum()
    }

    /// Returns the highest speed, in meters per second, at which any edge of
    /// the graph is traversed. Returns 0 for graphs without (timed) edges.
    pub fn max_speed(&self) -> f64 {
        self.0
            .values()
            .flat_map(|(_, edges)| edges.iter())
            .filter(|edge| edge.cost.time > 0.0)
            .map(|edge| edge.cost.distance / edge.cost.time)
            .fold(0.0, f64::max)
    }

    /// Returns the smallest [Bounds] containing all nodes of the graph,
    /// or `None` if the graph is empty.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut nodes = self.iter();
        let first = nodes.next()?;
        let initial = Bounds::new(first.lat, first.lon, first.lat, first.lon);
        Some(nodes.fold(initial, |b, n| {
            Bounds::new(
                b.south.min(n.lat),
                b.west.min(n.lon),
                b.north.max(n.lat),
                b.east.max(n.lon),
            )
        }))
    }

    /// Finds the closest [Node] to the given position, together with its
    /// distance in meters.
    ///
    /// This function requires computing the distance to every [Node] in the graph,
    /// and is not suitable for repeated lookups in large graphs -
    /// use a [GridIndex](crate::GridIndex) instead.
    pub fn find_nearest_node(&self, lat: f64, lon: f64) -> Option<(Node, f64)> {
        self.iter()
            .map(|&nd| (nd, earth_distance(lat, lon, nd.lat, nd.lon)))
            .min_by(|(_, a_dist), (_, b_dist)| a_dist.total_cmp(b_dist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, lat: f64, lon: f64) -> Node {
        Node { id, lat, lon }
    }

    fn cost(time: f64, distance: f64) -> EdgeCost {
        EdgeCost { time, distance }
    }

    fn small_graph() -> Graph {
        let mut g = Graph::new();
        g.set_node(node(1, 0.0, 0.0));
        g.set_node(node(2, 0.0, 0.01));
        g.set_node(node(3, 0.01, 0.01));
        g.set_edge(1, Edge { to: 2, cost: cost(10.0, 100.0) });
        g.set_edge(2, Edge { to: 3, cost: cost(20.0, 200.0) });
        g
    }

    #[test]
    fn set_edge_overwrites() {
        let mut g = small_graph();
        assert_eq!(g.get_edge(1, 2), Some(cost(10.0, 100.0)));

        assert!(g.set_edge(1, Edge { to: 2, cost: cost(5.0, 100.0) }));
        assert_eq!(g.get_edge(1, 2), Some(cost(5.0, 100.0)));
        assert_eq!(g.get_edges(1).len(), 1);
    }

    #[test]
    fn set_edge_to_unknown_node() {
        let mut g = small_graph();
        assert!(!g.set_edge(1, Edge { to: 42, cost: cost(1.0, 1.0) }));
        assert!(!g.set_edge(42, Edge { to: 1, cost: cost(1.0, 1.0) }));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn path_cost() {
        let g = small_graph();
        assert_eq!(g.path_cost(&[1, 2, 3]), Some(cost(30.0, 300.0)));
        assert_eq!(g.path_cost(&[1]), Some(EdgeCost::ZERO));
        assert_eq!(g.path_cost(&[3, 2, 1]), None);
    }

    #[test]
    fn max_speed() {
        let g = small_graph();
        assert_eq!(g.max_speed(), 10.0);
        assert_eq!(Graph::new().max_speed(), 0.0);
    }

    #[test]
    fn bounds() {
        let g = small_graph();
        assert_eq!(g.bounds(), Some(Bounds::new(0.0, 0.0, 0.01, 0.01)));
        assert_eq!(Graph::new().bounds(), None);
    }

    #[test]
    fn find_nearest_node() {
        let g = small_graph();
        let (nd, dist) = g.find_nearest_node(0.009, 0.011).unwrap();
        assert_eq!(nd.id, 3);
        assert!(dist < 200.0);
        assert!(Graph::new().find_nearest_node(0.0, 0.0).is_none());
    }
}
