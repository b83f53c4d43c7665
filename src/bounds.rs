// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::Coord;

/// An axis-aligned geographic bounding box, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Creates the smallest box containing both positions.
    pub fn from_corners(a: Coord, b: Coord) -> Self {
        Self::new(
            a.lat.min(b.lat),
            a.lon.min(b.lon),
            a.lat.max(b.lat),
            a.lon.max(b.lon),
        )
    }

    /// Creates a square (in degrees) box centered on the midpoint between
    /// two positions, with a side equal to the larger of the latitude and
    /// longitude spans between them.
    pub fn around(start: Coord, end: Coord) -> Self {
        let b = Self::from_corners(start, end);
        let center = b.center();
        let half_span = b.lat_span().max(b.lon_span()) / 2.0;
        Self::new(
            center.lat - half_span,
            center.lon - half_span,
            center.lat + half_span,
            center.lon + half_span,
        )
    }

    /// Extends the box on every side by `ratio` of its height (latitude)
    /// and width (longitude).
    pub fn pad(&self, ratio: f64) -> Self {
        let lat_buffer = self.lat_span().abs() * ratio;
        let lon_buffer = self.lon_span().abs() * ratio;
        Self::new(
            self.south - lat_buffer,
            self.west - lon_buffer,
            self.north + lat_buffer,
            self.east + lon_buffer,
        )
    }

    pub fn center(&self) -> Coord {
        Coord::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// Area of the box, in square degrees.
    pub fn area(&self) -> f64 {
        self.lat_span() * self.lon_span()
    }

    /// Checks if `other` lies entirely within this box (touching edges included).
    pub fn contains(&self, other: &Bounds) -> bool {
        self.south <= other.south
            && self.west <= other.west
            && self.north >= other.north
            && self.east >= other.east
    }

    pub fn contains_point(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    /// Returns the common part of two boxes, or `None` if they don't
    /// share any area.
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        let south = self.south.max(other.south);
        let north = self.north.min(other.north);
        let west = self.west.max(other.west);
        let east = self.east.min(other.east);

        if north <= south || east <= west {
            None
        } else {
            Some(Self::new(south, west, north, east))
        }
    }

    /// Returns which fraction of the `query` box area is covered by this box.
    /// Disjoint boxes, and queries without any area, give 0.
    pub fn overlap_ratio(&self, query: &Bounds) -> f64 {
        let query_area = query.area();
        if !(query_area > 0.0) {
            return 0.0;
        }

        match self.intersection(query) {
            Some(common) => common.area() / query_area,
            None => 0.0,
        }
    }

    /// Rounds every side of the box to `precision` decimal places.
    pub fn rounded(&self, precision: u32) -> Self {
        Self::new(
            round_to(self.south, precision),
            round_to(self.west, precision),
            round_to(self.north, precision),
            round_to(self.east, precision),
        )
    }

    /// Returns a `"south,west,north,east"` key of the box rounded to
    /// `precision` decimal places. At a precision of 2, boxes differing by less
    /// than about a kilometer share a key.
    pub fn key(&self, precision: u32) -> String {
        let r = self.rounded(precision);
        format!("{},{},{},{}", r.south, r.west, r.north, r.east)
    }

    /// Parses a key generated by [Bounds::key].
    pub fn from_key(key: &str) -> Option<Self> {
        let mut parts = key.split(',').map(|p| p.trim().parse::<f64>());
        let south = parts.next()?.ok()?;
        let west = parts.next()?.ok()?;
        let north = parts.next()?.ok()?;
        let east = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(south, west, north, east))
    }

    /// Splits the box into a `dim × dim` grid of equally-sized tiles,
    /// ordered south-to-north, then west-to-east.
    pub fn tiles(&self, dim: usize) -> Vec<Bounds> {
        if dim == 0 {
            return Vec::default();
        }

        let lat_step = self.lat_span() / dim as f64;
        let lon_step = self.lon_span() / dim as f64;
        let mut tiles = Vec::with_capacity(dim * dim);

        for i in 0..dim {
            for j in 0..dim {
                let south = self.south + i as f64 * lat_step;
                let west = self.west + j as f64 * lon_step;
                tiles.push(Self::new(south, west, south + lat_step, west + lon_step));
            }
        }

        tiles
    }
}

/// Rounds half-way values up (towards positive infinity), and never returns negative zero.
pub(crate) fn round_to(x: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (x * factor + 0.5).floor() / factor + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-9),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    #[test]
    fn around_is_square() {
        let b = Bounds::around(Coord::new(52.0, 21.0), Coord::new(52.2, 21.6));
        assert_almost_eq!(b.lat_span(), 0.6);
        assert_almost_eq!(b.lon_span(), 0.6);
        assert_almost_eq!(b.center().lat, 52.1);
        assert_almost_eq!(b.center().lon, 21.3);
    }

    #[test]
    fn pad() {
        let b = Bounds::new(0.0, 0.0, 1.0, 2.0).pad(0.1);
        assert_almost_eq!(b.south, -0.1);
        assert_almost_eq!(b.north, 1.1);
        assert_almost_eq!(b.west, -0.2);
        assert_almost_eq!(b.east, 2.2);
    }

    #[test]
    fn contains() {
        let outer = Bounds::new(0.0, 0.0, 1.0, 1.0);
        assert!(outer.contains(&Bounds::new(0.2, 0.2, 0.8, 0.8)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&Bounds::new(0.2, 0.2, 1.2, 0.8)));
        assert!(outer.contains_point(0.5, 1.0));
        assert!(!outer.contains_point(0.5, 1.01));
    }

    #[test]
    fn overlap_ratio() {
        let cached = Bounds::new(0.0, 0.0, 1.0, 1.0);

        // 85% of the query lies within the cached box
        assert_almost_eq!(cached.overlap_ratio(&Bounds::new(0.15, 0.0, 1.15, 1.0)), 0.85);

        // half of the query lies within the cached box
        assert_almost_eq!(cached.overlap_ratio(&Bounds::new(0.5, 0.0, 1.5, 1.0)), 0.5);

        // disjoint and touching boxes
        assert_eq!(cached.overlap_ratio(&Bounds::new(2.0, 2.0, 3.0, 3.0)), 0.0);
        assert_eq!(cached.overlap_ratio(&Bounds::new(1.0, 0.0, 2.0, 1.0)), 0.0);

        // degenerate query
        assert_eq!(cached.overlap_ratio(&Bounds::new(0.5, 0.5, 0.5, 0.5)), 0.0);
    }

    #[test]
    fn key() {
        let b = Bounds::new(52.2297, 21.0122, 52.4064, -0.001);
        assert_eq!(b.key(2), "52.23,21.01,52.41,0");
        assert_eq!(Bounds::new(1.0, 2.5, 3.0, -4.125).key(2), "1,2.5,3,-4.12");
    }

    #[test]
    fn key_round_trip() {
        let b = Bounds::new(52.23, 21.01, 52.41, 21.2);
        assert_eq!(Bounds::from_key(&b.key(2)), Some(b));
        assert_eq!(Bounds::from_key("route_52.23,21.01_to_52.41,21.2"), None);
        assert_eq!(Bounds::from_key("1,2,3"), None);
        assert_eq!(Bounds::from_key("1,2,3,4,5"), None);
    }

    #[test]
    fn tiles() {
        let tiles = Bounds::new(0.0, 0.0, 2.0, 4.0).tiles(2);
        assert_eq!(
            tiles,
            vec![
                Bounds::new(0.0, 0.0, 1.0, 2.0),
                Bounds::new(0.0, 2.0, 1.0, 4.0),
                Bounds::new(1.0, 0.0, 2.0, 2.0),
                Bounds::new(1.0, 2.0, 2.0, 4.0),
            ]
        );
        assert!(Bounds::new(0.0, 0.0, 1.0, 1.0).tiles(0).is_empty());
    }
}
