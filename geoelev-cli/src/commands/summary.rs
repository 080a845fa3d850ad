use anyhow::{Context, Result};
use std::time::Instant;

use super::ServiceOptions;

pub fn run(options: &ServiceOptions, force: bool) -> Result<()> {
    // Resident services never write the summary
    let builder = options.builder()?.resident(false).always_rebuild(force);
    let summary_path = builder.summary_path();
    let existed = summary_path.exists();

    let start = Instant::now();
    let service = builder.build().context("Failed to build tile summary")?;
    let catalog = service.catalog();

    if existed && !force {
        println!(
            "Summary already exists: {} ({} tiles). Use --force to rebuild.",
            summary_path.display(),
            catalog.len()
        );
        return Ok(());
    }

    println!(
        "{:<6} {:>10} {:>10} {:>11} {:>11}  FILE",
        "ID", "LAT MIN", "LAT MAX", "LNG MIN", "LNG MAX"
    );
    println!("{}", "-".repeat(60));
    for tile in catalog.tiles() {
        let b = tile.bounds();
        println!(
            "{:<6} {:>10.4} {:>10.4} {:>11.4} {:>11.4}  {}",
            tile.id().0,
            b.lat_min,
            b.lat_max,
            b.lng_min,
            b.lng_max,
            tile.file().display()
        );
    }

    println!();
    println!("Summary:");
    println!("  Total tiles: {}", catalog.len());
    println!("  Elapsed: {:.2}s", start.elapsed().as_secs_f64());
    println!("  Data directory: {}", service.tiles_folder().display());
    println!("  Written to: {}", summary_path.display());
    Ok(())
}
