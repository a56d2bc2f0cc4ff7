// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use routegraph::{Graph, WgsPos};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct PackageImportError(PathBuf, #[source] routegraph::Error);

#[derive(Parser)]
struct Cli {
    /// Path to a package file; may be given multiple times
    #[arg(short, long = "package", required = true)]
    packages: Vec<PathBuf>,

    /// Latitude of the query point
    lat: f64,

    /// Longitude of the query point
    lon: f64,
}

/// Formats a string as a quoted JSON string literal.
fn json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let g = Graph::default();
    for path in &cli.packages {
        g.import_file(path)
            .map_err(|e| PackageImportError(path.clone(), e))?;
    }

    let nearest = g.find_nearest_node(WgsPos::new(cli.lat, cli.lon))?;

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");

    let mut candidates = nearest.iter().peekable();
    while let Some(candidate) = candidates.next() {
        let node = g.get_node(candidate.node_id)?;
        let name = g.get_node_name(&node)?;
        let geometry = g.get_node_geometry(&node)?;

        println!("    {{");
        println!("      \"type\": \"Feature\",");
        println!("      \"properties\": {{");
        println!("        \"node\": \"{}\",", candidate.node_id);
        println!("        \"name\": {},", json_string(&name));
        println!("        \"segment_index\": {},", candidate.segment_index);
        println!("        \"rel_pos\": {},", candidate.rel_pos);
        println!(
            "        \"projected\": [{}, {}]",
            candidate.pos.lon, candidate.pos.lat
        );
        println!("      }},");

        println!("      \"geometry\": {{");
        println!("        \"type\": \"LineString\",");
        println!("        \"coordinates\": [");

        let mut points = geometry.iter().peekable();
        while let Some(pos) = points.next() {
            let suffix = if points.peek().is_some() { "," } else { "" };
            println!("          [{}, {}]{}", pos.lon, pos.lat, suffix);
        }

        println!("        ]");
        println!("      }}");
        let suffix = if candidates.peek().is_some() { "," } else { "" };
        println!("    }}{}", suffix);
    }

    println!("  ]");
    println!("}}");

    Ok(())
}
