// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use crate::osm::model::Element;

mod json;
mod xml;

/// Format of the input OSM data
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    #[default]
    Unknown,

    /// Force [Overpass JSON](https://wiki.openstreetmap.org/wiki/OSM_JSON)
    Json,

    /// Force [Overpass JSON](https://wiki.openstreetmap.org/wiki/OSM_JSON)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    JsonGz,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the extension of a file, returning [FileFormat::Unknown]
    /// for unrecognized extensions.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let name = match path.as_ref().file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_ascii_lowercase(),
            None => return Self::Unknown,
        };

        if name.ends_with(".json.gz") {
            Self::JsonGz
        } else if name.ends_with(".json") {
            Self::Json
        } else if name.ends_with(".osm.gz") || name.ends_with(".xml.gz") {
            Self::XmlGz
        } else if name.ends_with(".osm.bz2") || name.ends_with(".xml.bz2") {
            Self::XmlBz2
        } else if name.ends_with(".osm") || name.ends_with(".xml") {
            Self::Xml
        } else {
            Self::Unknown
        }
    }
}

/// Reasons why OSM elements could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unrecognized format of OSM data")]
    UnsupportedFormat,
}

/// Compression detected from the leading bytes of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    fn sniff(prefix: &[u8]) -> Self {
        if prefix.starts_with(&[0x1F, 0x8B]) {
            Self::Gzip
        } else if prefix.starts_with(b"BZh") {
            Self::Bzip2
        } else {
            Self::None
        }
    }
}

/// Guesses whether uncompressed data is JSON ([FileFormat::Json]) or XML ([FileFormat::Xml])
/// from its first significant character.
fn sniff_content(prefix: &[u8]) -> FileFormat {
    let prefix = prefix.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(prefix);
    match prefix.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => FileFormat::Json,
        Some(b'<') => FileFormat::Xml,
        _ => FileFormat::Unknown,
    }
}

/// Parse OSM elements from a reader in the provided [FileFormat].
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn elements_from_io<R: io::Read>(
    reader: R,
    format: FileFormat,
) -> Result<Vec<Element>, ReadError> {
    match format {
        FileFormat::Unknown => elements_from_unknown(io::BufReader::new(reader)),

        FileFormat::Json => Ok(json::elements_from_io(io::BufReader::new(reader))?),

        FileFormat::JsonGz => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            Ok(json::elements_from_io(io::BufReader::new(d))?)
        }

        FileFormat::Xml => elements_from_xml(io::BufReader::new(reader)),

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            elements_from_xml(io::BufReader::new(d))
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(reader);
            elements_from_xml(io::BufReader::new(d))
        }
    }
}

/// Parse OSM elements from a file at the provided path.
pub fn elements_from_file<P: AsRef<Path>>(
    path: P,
    format: FileFormat,
) -> Result<Vec<Element>, ReadError> {
    let path = path.as_ref();
    let f = File::open(path)?;
    let elements = elements_from_io(f, format)?;
    log::debug!("loaded {} OSM elements from {}", elements.len(), path.display());
    Ok(elements)
}

/// Parse OSM elements from a static buffer.
pub fn elements_from_buffer(data: &[u8], format: FileFormat) -> Result<Vec<Element>, ReadError> {
    let format = match format {
        FileFormat::Unknown if Compression::sniff(data) == Compression::None => {
            sniff_content(data)
        }
        _ => format,
    };

    // Fast paths are available for in-memory uncompressed data
    match format {
        FileFormat::Json => Ok(json::elements_from_buffer(data)?),
        FileFormat::Xml => Ok(xml::Reader::from_buffer(data).collect::<Result<_, _>>()?),
        _ => elements_from_io(io::Cursor::new(data), format),
    }
}

fn elements_from_unknown<R: BufRead>(mut reader: R) -> Result<Vec<Element>, ReadError> {
    match Compression::sniff(reader.fill_buf()?) {
        Compression::Gzip => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            elements_from_uncompressed(io::BufReader::new(d))
        }
        Compression::Bzip2 => {
            let d = bzip2::read::MultiBzDecoder::new(reader);
            elements_from_uncompressed(io::BufReader::new(d))
        }
        Compression::None => elements_from_uncompressed(reader),
    }
}

fn elements_from_uncompressed<R: BufRead>(mut reader: R) -> Result<Vec<Element>, ReadError> {
    match sniff_content(reader.fill_buf()?) {
        FileFormat::Json => Ok(json::elements_from_io(reader)?),
        FileFormat::Xml => elements_from_xml(reader),
        _ => Err(ReadError::UnsupportedFormat),
    }
}

fn elements_from_xml<R: BufRead>(reader: R) -> Result<Vec<Element>, ReadError> {
    Ok(xml::Reader::from_io(reader).collect::<Result<_, _>>()?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SIMPLE_JSON: &[u8] = include_bytes!("test_fixtures/simple.json");
    const SIMPLE_XML: &[u8] = include_bytes!("test_fixtures/simple.osm");

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut e = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    fn bzip(data: &[u8]) -> Vec<u8> {
        let mut e = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    fn count(elements: &[Element]) -> (usize, usize) {
        let nodes = elements.iter().filter(|e| matches!(e, Element::Node(_))).count();
        let ways = elements.iter().filter(|e| matches!(e, Element::Way(_))).count();
        (nodes, ways)
    }

    #[test]
    fn explicit_formats() {
        let cases: [(Vec<u8>, FileFormat); 5] = [
            (SIMPLE_JSON.to_vec(), FileFormat::Json),
            (gzip(SIMPLE_JSON), FileFormat::JsonGz),
            (SIMPLE_XML.to_vec(), FileFormat::Xml),
            (gzip(SIMPLE_XML), FileFormat::XmlGz),
            (bzip(SIMPLE_XML), FileFormat::XmlBz2),
        ];

        for (data, format) in cases {
            let from_buffer = elements_from_buffer(&data, format).unwrap();
            assert_eq!(count(&from_buffer), (6, 4), "{format:?}");

            let from_io = elements_from_io(io::Cursor::new(&data), format).unwrap();
            assert_eq!(count(&from_io), (6, 4), "{format:?}");
        }
    }

    #[test]
    fn detect_format() {
        for data in [
            SIMPLE_JSON.to_vec(),
            gzip(SIMPLE_JSON),
            SIMPLE_XML.to_vec(),
            gzip(SIMPLE_XML),
            bzip(SIMPLE_XML),
        ] {
            let from_buffer = elements_from_buffer(&data, FileFormat::Unknown).unwrap();
            assert_eq!(count(&from_buffer), (6, 4));

            let from_io = elements_from_io(io::Cursor::new(&data), FileFormat::Unknown).unwrap();
            assert_eq!(count(&from_io), (6, 4));
        }
    }

    #[test]
    fn detect_format_unsupported() {
        assert!(matches!(
            elements_from_buffer(b"hello", FileFormat::Unknown),
            Err(ReadError::UnsupportedFormat),
        ));
        assert!(matches!(
            elements_from_io(io::Cursor::new(b""), FileFormat::Unknown),
            Err(ReadError::UnsupportedFormat),
        ));
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simple.osm.gz");
        std::fs::write(&path, gzip(SIMPLE_XML)).unwrap();

        assert_eq!(FileFormat::from_path(&path), FileFormat::XmlGz);
        let elements = elements_from_file(&path, FileFormat::from_path(&path)).unwrap();
        assert_eq!(count(&elements), (6, 4));

        assert!(matches!(
            elements_from_file(dir.path().join("missing.json"), FileFormat::Json),
            Err(ReadError::Io(_)),
        ));
    }

    #[test]
    fn file_format_from_path() {
        assert_eq!(FileFormat::from_path("a/monaco.json"), FileFormat::Json);
        assert_eq!(FileFormat::from_path("monaco.JSON.gz"), FileFormat::JsonGz);
        assert_eq!(FileFormat::from_path("monaco.osm"), FileFormat::Xml);
        assert_eq!(FileFormat::from_path("monaco.xml.gz"), FileFormat::XmlGz);
        assert_eq!(FileFormat::from_path("monaco.osm.bz2"), FileFormat::XmlBz2);
        assert_eq!(FileFormat::from_path("monaco.osm.pbf"), FileFormat::Unknown);
        assert_eq!(FileFormat::from_path(""), FileFormat::Unknown);
    }
}
