// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;

use serde::Deserialize;

use crate::osm::model::Element;

/// Top-level object of an [Overpass API](https://wiki.openstreetmap.org/wiki/Overpass_API)
/// response with `[out:json]`. Other members (`version`, `osm3s`, …) are ignored.
///
/// Elements are kept as raw values, so that a single malformed element
/// can be skipped without rejecting the whole document.
#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    elements: Vec<serde_json::Value>,
}

impl Document {
    fn into_elements(self) -> Vec<Element> {
        let mut skipped = 0;
        let elements: Vec<Element> = self
            .elements
            .into_iter()
            .filter_map(|value| match Element::deserialize(value) {
                Ok(element) => Some(element),
                Err(e) => {
                    log::debug!("skipping malformed OSM element: {e}");
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            log::warn!("skipped {skipped} malformed OSM elements");
        }

        elements
    }
}

pub(super) fn elements_from_io<R: io::Read>(reader: R) -> Result<Vec<Element>, serde_json::Error> {
    let doc: Document = serde_json::from_reader(reader)?;
    Ok(doc.into_elements())
}

pub(super) fn elements_from_buffer(data: &[u8]) -> Result<Vec<Element>, serde_json::Error> {
    let doc: Document = serde_json::from_slice(data)?;
    Ok(doc.into_elements())
}
