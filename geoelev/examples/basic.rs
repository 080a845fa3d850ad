//! Basic example demonstrating geoelev library usage.
//!
//! Run with: cargo run --example basic -- /path/to/tif/files

use geoelev::{ElevationError, ElevationService, LookupFault};
use std::env;

fn main() -> Result<(), ElevationError> {
    // Get tile folder from command line
    let tiles_folder = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example basic -- /path/to/tif/files");
        std::process::exit(1);
    });

    // Scans the folder (or reuses summary.json) with up to 5 open tiles
    let mut service = ElevationService::new(&tiles_folder, 5)?;
    println!("Catalogued {} tiles", service.catalog().len());

    // Query some famous peaks
    let locations = [
        ("Mount Fuji, Japan", 35.3606, 138.7274),
        ("Mount Everest, Nepal", 27.9881, 86.9250),
        ("Denali, Alaska", 63.0695, -151.0074),
    ];

    println!("Elevation queries:");
    println!("{:-<50}", "");

    for (name, lat, lng) in &locations {
        match service.try_lookup(*lat, *lng) {
            Ok(elevation) => println!("{}: {}m", name, elevation),
            Err(LookupFault::OutOfCoverage { .. }) => {
                println!("{}: no tile covers this point", name)
            }
            Err(fault) => println!("{}: {} (lookup returns 0)", name, fault),
        }
    }

    // Show cache statistics
    let stats = service.cache_stats();
    println!("\nCache statistics:");
    println!("  Open tiles: {}", stats.entry_count);
    println!("  Hits: {}", stats.hit_count);
    println!("  Misses: {}", stats.miss_count);
    println!("  Evictions: {}", stats.eviction_count);
    println!("  Hit rate: {:.1}%", stats.hit_rate() * 100.0);

    Ok(())
}
