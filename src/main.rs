// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use roadtrace::cache::{CacheConfig, CacheManager};
use roadtrace::osm::{FileFormat, ReadError};
use roadtrace::{Coord, CostMode, Route};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct GraphLoadError(PathBuf, #[source] ReadError);

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find a route and print it as GeoJSON
    Route {
        /// The path to the OSM file (Overpass JSON or OSM XML, optionally compressed)
        osm_file: PathBuf,

        /// Latitude of the start point
        start_lat: f64,

        /// Longitude of the start point
        start_lon: f64,

        /// Latitude of the end point
        end_lat: f64,

        /// Longitude of the end point
        end_lon: f64,

        /// Minimized cost
        #[arg(long, value_enum, default_value_t = CostMode::Time)]
        mode: CostMode,

        /// Format of the OSM file (guessed from the extension or content by default)
        #[arg(long, value_enum)]
        format: Option<FileFormat>,

        /// Also output all edges explored by the search
        #[arg(long)]
        trace: bool,
    },

    /// Inspect or maintain persisted caches
    Cache {
        /// Directory with persisted cache snapshots
        #[arg(long)]
        dir: PathBuf,

        /// JSON file with cache settings
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the number of cached entries
    Stats,

    /// Remove expired entries
    Cleanup,

    /// Remove all entries
    Clear,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    colog::default_builder()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    match cli.command {
        Command::Route {
            osm_file,
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            mode,
            format,
            trace,
        } => {
            let format = format.unwrap_or_else(|| FileFormat::from_path(&osm_file));
            let start = Coord::new(start_lat, start_lon);
            let end = Coord::new(end_lat, end_lon);
            route(&osm_file, format, start, end, mode, trace)
        }

        Command::Cache {
            dir,
            config,
            action,
        } => {
            let config = match config {
                Some(path) => CacheConfig::from_file(path)?,
                None => CacheConfig::default(),
            };
            cache(&dir, config, action);
            Ok(())
        }
    }
}

fn route(
    osm_file: &Path,
    format: FileFormat,
    start: Coord,
    end: Coord,
    mode: CostMode,
    with_trace: bool,
) -> Result<(), Box<dyn Error>> {
    let profile = &roadtrace::osm::CAR_PROFILE;
    let elements = roadtrace::osm::elements_from_file(osm_file, format)
        .map_err(|e| GraphLoadError(PathBuf::from(osm_file), e))?;
    let g = roadtrace::osm::build_graph(&elements, profile)?;

    // Index the whole graph
    let bounds = g
        .bounds()
        .unwrap_or_else(|| roadtrace::search_bounds(start, end, false));

    let route = roadtrace::route_between(Arc::new(g), bounds, start, end, mode, profile)?;

    print_geojson(&route, with_trace);
    eprintln!(
        "time: {:.1} min, distance: {:.2} km, explored edges: {}",
        route.cost.time / 60.0,
        route.cost.distance / 1000.0,
        route.trace.len(),
    );

    Ok(())
}

fn print_geojson(route: &Route, with_trace: bool) {
    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");
    println!("    {{");
    println!("      \"type\": \"Feature\",");
    println!(
        "      \"properties\": {{\"kind\": \"route\", \"time\": {}, \"distance\": {}}},",
        route.cost.time, route.cost.distance,
    );

    println!("      \"geometry\": {{");
    println!("        \"type\": \"LineString\",");
    println!("        \"coordinates\": [");

    let mut nodes = route.path.iter().peekable();
    while let Some(node) = nodes.next() {
        let suffix = if nodes.peek().is_some() { "," } else { "" };
        println!("          [{}, {}]{}", node.lon, node.lat, suffix);
    }

    println!("        ]");
    println!("      }}");

    if with_trace {
        println!("    }},");
        println!("    {{");
        println!("      \"type\": \"Feature\",");
        println!(
            "      \"properties\": {{\"kind\": \"explored\", \"batches\": {}}},",
            route.trace.batches().len(),
        );
        println!("      \"geometry\": {{");
        println!("        \"type\": \"MultiLineString\",");
        println!("        \"coordinates\": [");

        let mut visits = route.trace.iter().peekable();
        while let Some(v) = visits.next() {
            let suffix = if visits.peek().is_some() { "," } else { "" };
            println!(
                "          [[{}, {}], [{}, {}]]{}",
                v.from.lon, v.from.lat, v.to.lon, v.to.lat, suffix
            );
        }

        println!("        ]");
        println!("      }}");
    }

    println!("    }}");
    println!("  ]");
    println!("}}");
}

fn cache(dir: &Path, config: CacheConfig, action: CacheAction) {
    let manager = CacheManager::open(dir, config);

    match action {
        CacheAction::Stats => {
            println!("{}", manager.stats());
            match manager.map_data_snapshot() {
                Ok(meta) => println!("{} map data entries persisted (metadata only)", meta.len()),
                Err(e) => log::warn!("failed to read map data metadata: {e}"),
            }
        }

        CacheAction::Cleanup => {
            let removed = manager.cleanup();
            println!("removed {removed} expired entries, {} left", manager.stats());
        }

        CacheAction::Clear => manager.clear_all(),
    }
}
