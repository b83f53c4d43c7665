// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::Node;

/// Represents an [OSM way](https://wiki.openstreetmap.org/wiki/Way).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Way {
    pub id: i64,

    #[serde(default)]
    pub nodes: Vec<i64>,

    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Type of an [OSM element](https://wiki.openstreetmap.org/wiki/Elements)
/// relevant for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    Node,
    Way,
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Way => write!(f, "way"),
        }
    }
}

/// Union over [OSM elements](https://wiki.openstreetmap.org/wiki/Elements),
/// in the shape used by the [Overpass API](https://wiki.openstreetmap.org/wiki/Overpass_API)
/// JSON output, e.g. `{"type": "node", "id": 1, "lat": 0.0, "lon": 0.0}`.
///
/// Relations and other element types are kept as [Element::Other] and ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(Node),
    Way(Way),

    #[serde(other)]
    Other,
}

impl Element {
    /// Returns the type and id of this element, or `None` for [Element::Other].
    pub fn key(&self) -> Option<(ElementType, i64)> {
        match self {
            Self::Node(n) => Some((ElementType::Node, n.id)),
            Self::Way(w) => Some((ElementType::Way, w.id)),
            Self::Other => None,
        }
    }
}

/// Merges element lists (e.g. downloaded for adjacent [tiles](crate::Bounds::tiles))
/// into one, dropping repeated elements. If the same (type, id) pair appears more than
/// once, the first occurrence wins. [Element::Other] entries are dropped.
pub fn merge_elements<I>(lists: I) -> Vec<Element>
where
    I: IntoIterator<Item = Vec<Element>>,
{
    let mut seen: HashSet<(ElementType, i64)> = HashSet::default();
    let mut merged = Vec::default();

    for element in lists.into_iter().flatten() {
        if let Some(key) = element.key() {
            if seen.insert(key) {
                merged.push(element);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, lat: f64) -> Element {
        Element::Node(Node { id, lat, lon: 0.0 })
    }

    fn way(id: i64, nodes: Vec<i64>) -> Element {
        Element::Way(Way {
            id,
            nodes,
            tags: HashMap::default(),
        })
    }

    #[test]
    fn deserialize() {
        let elements: Vec<Element> = serde_json::from_str(
            r#"[
                {"type": "node", "id": 1, "lat": 52.1, "lon": 21.0, "tags": {"highway": "stop"}},
                {"type": "way", "id": 10, "nodes": [1, 2], "tags": {"highway": "primary"}},
                {"type": "way", "id": 11},
                {"type": "relation", "id": 100, "members": []}
            ]"#,
        )
        .unwrap();

        assert_eq!(elements.len(), 4);
        assert_eq!(
            elements[0],
            Element::Node(Node {
                id: 1,
                lat: 52.1,
                lon: 21.0
            })
        );
        match &elements[1] {
            Element::Way(w) => {
                assert_eq!(w.id, 10);
                assert_eq!(w.nodes, vec![1, 2]);
                assert_eq!(w.tags.get("highway").map(String::as_str), Some("primary"));
            }
            other => panic!("expected a way, got {other:?}"),
        }
        assert_eq!(elements[2], way(11, vec![]));
        assert_eq!(elements[3], Element::Other);
    }

    #[test]
    fn merge_first_occurrence_wins() {
        let merged = merge_elements([
            vec![node(1, 1.0), node(2, 2.0), way(1, vec![1, 2])],
            vec![node(2, 20.0), node(3, 3.0), way(1, vec![2, 1]), Element::Other],
        ]);

        assert_eq!(
            merged,
            vec![
                node(1, 1.0),
                node(2, 2.0),
                way(1, vec![1, 2]),
                node(3, 3.0),
            ]
        );
    }

    #[test]
    fn merge_distinguishes_types() {
        let merged = merge_elements([vec![node(7, 0.0)], vec![way(7, vec![])]]);
        assert_eq!(merged.len(), 2);
    }
}
