//! # geoelev - GeoTIFF Elevation Library
//!
//! Point elevation lookups over a folder of georeferenced GeoTIFF tiles.
//!
//! ## Features
//!
//! - **Indexed**: Tile extents go into an R-tree, so a lookup only touches
//!   the tile that covers the point
//! - **Bounded**: At most `open_handles` tiles are memory-mapped at once,
//!   evicted in least-recently-used order
//! - **Reprojecting**: WGS84 queries are transformed into each tile's native
//!   CRS (EPSG code from its GeoKeys)
//! - **Total**: `lookup` never fails; sea level (0) is returned outside
//!   coverage, on void cells and on any read fault
//!
//! ## Quick Start
//!
//! ```ignore
//! use geoelev::ElevationService;
//!
//! // Scans /data/240 on first start and writes /data/240/summary.json
//! let mut service = ElevationService::new("/data/240", 5)?;
//! let elevation = service.lookup(27.9881, 86.9250);
//! println!("Elevation: {}m", elevation);
//! ```
//!
//! ## Summary Document
//!
//! The catalog of a folder is persisted as a JSON array of
//! `{"file": ..., "coords": [lat_min, lat_max, lng_min, lng_max]}` objects
//! and reused on later starts unless a rebuild is requested.
//!
//! ## Resident Mode
//!
//! With [`ElevationServiceBuilder::resident`] every tile is decoded into
//! memory at startup. Resident lookups skip reprojection, so that mode is
//! only correct for folders whose tiles are all natively WGS84.

pub mod cache;
pub mod catalog;
pub mod error;
pub mod geotransform;
pub mod index;
pub mod projection;
pub mod service;
pub mod tile;

#[cfg(test)]
mod fixtures;

// Re-export main types at crate root for convenience
pub use cache::{CacheStats, TileCache};
pub use catalog::{Catalog, TileBounds, TileDescriptor, TileHandleTable, TileId};
pub use error::{ElevationError, LookupFault, LookupResult, Result};
pub use geotransform::{Corners, GeoTransform};
pub use index::SpatialIndex;
pub use projection::{CoordinateTransform, WGS84_EPSG};
pub use service::{
    ElevationService, ElevationServiceBuilder, DEFAULT_OPEN_HANDLES, SUMMARY_FILE_NAME,
};
pub use tile::{RasterTile, TileStatistics, NO_DATA, SEA_LEVEL};
