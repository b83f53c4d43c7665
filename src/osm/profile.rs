// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

/// Kilometers in a statute mile.
const KM_PER_MILE: f64 = 1.60934;

/// Describes how to convert OSM ways into timed edges of a [Graph](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile<'a> {
    /// Human readable name of the routing profile.
    pub name: &'a str,

    /// Typical speeds of [highway](https://wiki.openstreetmap.org/wiki/Key:highway) types.
    ///
    /// A way is matched against all [Speed] objects in order, and the first one
    /// with a `highway` value equal to the way's `highway` tag is used.
    /// A [maxspeed](https://wiki.openstreetmap.org/wiki/Key:maxspeed) tag on the way
    /// takes precedence over this table.
    pub speeds: &'a [Speed<'a>],

    /// Speed (in km/h) of ways which don't match any entry in [Profile::speeds].
    pub default_speed: f64,
}

/// Typical speed on ways with a specific `highway` tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speed<'a> {
    /// Value of the `highway` tag for which this Speed applies,
    /// e.g. "motorway" or "residential".
    pub highway: &'a str,

    /// Speed, in kilometers per hour. Must be positive and finite.
    pub kmh: f64,
}

impl<'a> Profile<'a> {
    /// Returns the speed (in km/h) on a way with the given tags.
    ///
    /// A `maxspeed` tag overrides the [Profile::speeds] table if it contains a number;
    /// the number is converted from mph if the tag mentions `mph`.
    pub fn way_speed(&self, tags: &HashMap<String, String>) -> f64 {
        tags.get("maxspeed")
            .and_then(|v| parse_maxspeed(v))
            .unwrap_or_else(|| self.highway_speed(tags.get("highway").map(|v| v.as_str())))
    }

    /// Returns the speed (in km/h) from the [Profile::speeds] table,
    /// falling back to [Profile::default_speed].
    pub fn highway_speed(&self, highway: Option<&str>) -> f64 {
        highway
            .and_then(|highway| {
                self.speeds
                    .iter()
                    .find(|s| s.highway == highway)
                    .map(|s| s.kmh)
            })
            .unwrap_or(self.default_speed)
    }

    /// Returns the highest speed (in km/h) from the [Profile::speeds] table
    /// and [Profile::default_speed].
    pub fn max_speed_kmh(&self) -> f64 {
        self.speeds
            .iter()
            .map(|s| s.kmh)
            .fold(self.default_speed, f64::max)
    }

    /// Same as [Profile::max_speed_kmh], but in meters per second.
    pub fn max_speed_ms(&self) -> f64 {
        kmh_to_ms(self.max_speed_kmh())
    }

    /// Checks if a way is traversable forward (first return value) and
    /// backwards (second return value).
    ///
    /// `oneway=-1` reverses the way; `oneway=yes` and `oneway=1` make it one-way.
    /// Roundabouts and motorways (including `motorway_link`) default to being one-way,
    /// except if tagged with `oneway=no`.
    pub fn way_direction(&self, tags: &HashMap<String, String>) -> (bool, bool) {
        let oneway = tags.get("oneway").map(|s| s.as_str());
        let highway = tags.get("highway").map(|s| s.as_str()).unwrap_or("");
        let junction = tags.get("junction").map(|s| s.as_str()).unwrap_or("");

        match oneway {
            Some("-1") => (false, true),
            Some("yes") | Some("1") => (true, false),
            _ if junction == "roundabout" => (true, false),
            _ if highway.contains("motorway") && oneway != Some("no") => (true, false),
            _ => (true, true),
        }
    }

    /// Returns the multiplier of the travel time on a way,
    /// estimating congestion from the number of [lanes](https://wiki.openstreetmap.org/wiki/Key:lanes).
    ///
    /// Single-lane roads are slowed down, roads with 4 or more lanes are sped up.
    /// Motorways without a valid `lanes` tag are assumed to be wide.
    pub fn congestion_factor(&self, tags: &HashMap<String, String>) -> f64 {
        match tags.get("lanes").and_then(|v| parse_leading_int(v)) {
            Some(1) => 1.15,
            Some(2) => 1.05,
            Some(lanes) if lanes >= 4 => 0.9,
            Some(_) => 1.0,
            None => match tags.get("highway").map(|s| s.as_str()) {
                Some("motorway") | Some("motorway_link") => 0.9,
                _ => 1.0,
            },
        }
    }
}

/// Converts a speed in km/h to m/s.
pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh * 1000.0 / 3600.0
}

/// Parses a [maxspeed](https://wiki.openstreetmap.org/wiki/Key:maxspeed) value into km/h.
///
/// The first run of digits is used as the speed; values mentioning `mph` are converted
/// from miles per hour. Returns `None` for values without a (positive) number,
/// like `none` or `signals`.
pub fn parse_maxspeed(value: &str) -> Option<f64> {
    let start = value.find(|c: char| c.is_ascii_digit())?;
    let digits = &value[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let speed: f64 = digits[..end].parse().ok()?;

    if speed <= 0.0 {
        None
    } else if value.contains("mph") {
        Some(speed * KM_PER_MILE)
    } else {
        Some(speed)
    }
}

/// Parses an optionally signed integer at the start of a string (after leading whitespace),
/// ignoring anything after it. E.g. `"2;3"` gives 2.
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let sign_len = if value.starts_with(['-', '+']) { 1 } else { 0 };
    let end = value[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| i + sign_len)
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Example routing [Profile] for cars, with typical speeds on different road classes.
pub const CAR_PROFILE: Profile = Profile {
    name: "motorcar",
    speeds: &[
        Speed {
            highway: "motorway",
            kmh: 110.0,
        },
        Speed {
            highway: "trunk",
            kmh: 90.0,
        },
        Speed {
            highway: "primary",
            kmh: 80.0,
        },
        Speed {
            highway: "secondary",
            kmh: 70.0,
        },
        Speed {
            highway: "tertiary",
            kmh: 50.0,
        },
        Speed {
            highway: "unclassified",
            kmh: 40.0,
        },
        Speed {
            highway: "residential",
            kmh: 30.0,
        },
        Speed {
            highway: "motorway_link",
            kmh: 60.0,
        },
        Speed {
            highway: "trunk_link",
            kmh: 50.0,
        },
        Speed {
            highway: "primary_link",
            kmh: 40.0,
        },
        Speed {
            highway: "secondary_link",
            kmh: 40.0,
        },
        Speed {
            highway: "tertiary_link",
            kmh: 30.0,
        },
        Speed {
            highway: "living_street",
            kmh: 10.0,
        },
        Speed {
            highway: "service",
            kmh: 10.0,
        },
    ],
    default_speed: 40.0,
};
