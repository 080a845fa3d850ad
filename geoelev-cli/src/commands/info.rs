use anyhow::{bail, Context, Result};
use geoelev::RasterTile;
use std::path::PathBuf;

pub fn run(tile_path: PathBuf) -> Result<()> {
    if !tile_path.exists() {
        bail!("Tile not found: {}", tile_path.display());
    }

    let mut tile = RasterTile::open(&tile_path).context("Failed to load tile")?;
    let file_size = std::fs::metadata(&tile_path)?.len();
    let stats = tile.statistics().context("Failed to read elevations")?;
    let bounds = tile.bounds();
    let gt = tile.geo_transform().coefficients();

    println!("Tile: {}", tile_path.display());
    println!();
    println!("Size: {}x{} pixels", tile.width(), tile.height());
    println!("EPSG: {}", tile.epsg());
    println!(
        "GeoTransform: [{}, {}, {}, {}, {}, {}]",
        gt[0], gt[1], gt[2], gt[3], gt[4], gt[5]
    );
    println!(
        "Bounds: lat {} to {}, lng {} to {}",
        bounds.lat_min, bounds.lat_max, bounds.lng_min, bounds.lng_max
    );
    println!("File size: {}", format_size(file_size));
    println!();

    if let (Some(min), Some(max)) = (stats.min, stats.max) {
        println!("Min elevation: {}m", min);
        println!("Max elevation: {}m", max);
    }
    if let Some(mean) = stats.mean {
        println!("Mean elevation: {:.1}m", mean);
    }

    let total = stats.valid_count + stats.no_data_count;
    if stats.no_data_count > 0 && total > 0 {
        let pct = (stats.no_data_count as f64 / total as f64) * 100.0;
        println!("No-data samples: {} ({:.1}%)", stats.no_data_count, pct);
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
