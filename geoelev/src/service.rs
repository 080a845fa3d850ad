//! Elevation lookups over a folder of GeoTIFF tiles.
//!
//! This module provides [`ElevationService`], which ties a [`Catalog`], its
//! [`SpatialIndex`] and either a [`TileCache`] (streaming) or a
//! [`TileHandleTable`] (resident) together behind a single `lookup` call.
//!
//! ```ignore
//! use geoelev::ElevationServiceBuilder;
//!
//! let mut service = ElevationServiceBuilder::new("/data/240")
//!     .open_handles(5)
//!     .build()?;
//!
//! // 0 outside coverage, on void cells and on any read fault
//! let elevation = service.lookup(27.98, 86.92);
//! ```

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cache::{CacheStats, TileCache};
use crate::catalog::{Catalog, TileDescriptor, TileHandleTable};
use crate::error::{ElevationError, LookupFault, LookupResult, Result};
use crate::index::SpatialIndex;
use crate::tile::SEA_LEVEL;

/// Default number of simultaneously open tiles.
pub const DEFAULT_OPEN_HANDLES: usize = 5;

/// File name of the catalog document inside a tile folder.
pub const SUMMARY_FILE_NAME: &str = "summary.json";

enum TileStore {
    Cached(TileCache),
    Resident(TileHandleTable),
}

/// Elevation resolver for one tile folder.
///
/// All lookup methods take `&mut self`: a lookup may open, evict or decode
/// tiles. Wrap the service in a `Mutex` to share it between threads.
///
/// # Example
///
/// ```ignore
/// use geoelev::ElevationService;
///
/// let mut service = ElevationService::new("/data/tiles", 5)?;
/// match service.try_lookup(15.0, 105.0) {
///     Ok(elevation) => println!("{}m", elevation),
///     Err(fault) => println!("no sample: {}", fault),
/// }
/// ```
pub struct ElevationService {
    tiles_folder: PathBuf,
    catalog: Catalog,
    index: SpatialIndex,
    store: TileStore,
}

impl ElevationService {
    /// Create a streaming service, reusing `<tiles_folder>/summary.json` if
    /// present.
    ///
    /// # Errors
    ///
    /// See [`ElevationServiceBuilder::build`].
    pub fn new<P: AsRef<Path>>(tiles_folder: P, open_handles: usize) -> Result<Self> {
        ElevationServiceBuilder::new(tiles_folder)
            .open_handles(open_handles)
            .build()
    }

    /// Create a builder for custom configuration.
    pub fn builder<P: AsRef<Path>>(tiles_folder: P) -> ElevationServiceBuilder {
        ElevationServiceBuilder::new(tiles_folder)
    }

    fn assemble(tiles_folder: PathBuf, catalog: Catalog, store: TileStore) -> Self {
        let start = Instant::now();
        let index = SpatialIndex::build(&catalog);
        tracing::info!(
            tiles = index.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built spatial index"
        );
        Self {
            tiles_folder,
            catalog,
            index,
            store,
        }
    }

    /// Get the elevation at the specified coordinates.
    ///
    /// Never fails: points outside every tile, void cells and any fault while
    /// reading a tile all yield [`SEA_LEVEL`]. Faults are logged.
    ///
    /// # Arguments
    ///
    /// * `lat` - Latitude in decimal degrees
    /// * `lng` - Longitude in decimal degrees
    pub fn lookup(&mut self, lat: f64, lng: f64) -> i32 {
        match self.try_lookup(lat, lng) {
            Ok(elevation) => elevation,
            Err(fault @ LookupFault::OutOfCoverage { .. }) => {
                tracing::debug!(lat, lng, error = %fault, "Lookup outside coverage");
                SEA_LEVEL
            }
            Err(fault) => {
                tracing::warn!(lat, lng, error = %fault, "Lookup failed");
                SEA_LEVEL
            }
        }
    }

    /// Get the elevation at the specified coordinates, keeping the reason
    /// when no sample is available.
    ///
    /// When tiles overlap, the first match of the spatial index is used.
    ///
    /// # Errors
    ///
    /// Returns [`LookupFault::OutOfCoverage`] if no tile contains the point,
    /// or the fault raised while opening or sampling the matching tile.
    pub fn try_lookup(&mut self, lat: f64, lng: f64) -> LookupResult<i32> {
        let descriptor = self
            .index
            .first_match(lat, lng)
            .ok_or(LookupFault::OutOfCoverage { lat, lng })?;

        let tile = match &mut self.store {
            TileStore::Cached(cache) => cache.acquire(descriptor.file())?,
            TileStore::Resident(table) => table.get_mut(descriptor.id()).ok_or_else(|| {
                LookupFault::Decode(format!("tile {} is not resident", descriptor.id()))
            })?,
        };
        tile.sample(lat, lng)
    }

    /// Get elevations for multiple coordinates, in order.
    ///
    /// # Arguments
    ///
    /// * `coords` - Slice of (latitude, longitude) pairs
    pub fn lookup_batch(&mut self, coords: &[(f64, f64)]) -> Vec<i32> {
        coords
            .iter()
            .map(|&(lat, lng)| self.lookup(lat, lng))
            .collect()
    }

    /// Every tile covering `(lat, lng)`, in the order lookups consider them.
    pub fn covering_tiles(&self, lat: f64, lng: f64) -> Vec<&TileDescriptor> {
        self.index.query(lat, lng)
    }

    /// Get cache statistics.
    ///
    /// Resident services report every tile as an entry and no traffic.
    pub fn cache_stats(&self) -> CacheStats {
        match &self.store {
            TileStore::Cached(cache) => cache.stats(),
            TileStore::Resident(table) => CacheStats {
                entry_count: table.len() as u64,
                ..CacheStats::default()
            },
        }
    }

    /// Maximum number of open tiles, or `None` for resident services.
    pub fn cache_capacity(&self) -> Option<usize> {
        match &self.store {
            TileStore::Cached(cache) => Some(cache.capacity()),
            TileStore::Resident(_) => None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Folder the catalog was built from.
    pub fn tiles_folder(&self) -> &Path {
        &self.tiles_folder
    }

    /// Whether every tile is held in memory.
    pub fn is_resident(&self) -> bool {
        matches!(self.store, TileStore::Resident(_))
    }
}

/// Builder for creating [`ElevationService`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use geoelev::ElevationServiceBuilder;
///
/// let service = ElevationServiceBuilder::new("/data/tiles")
///     .open_handles(8)
///     .always_rebuild(true)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ElevationServiceBuilder {
    tiles_folder: PathBuf,
    summary_file: Option<PathBuf>,
    open_handles: usize,
    always_rebuild: bool,
    resident: bool,
}

impl ElevationServiceBuilder {
    /// Create a new builder for the specified tile folder.
    pub fn new<P: AsRef<Path>>(tiles_folder: P) -> Self {
        Self {
            tiles_folder: tiles_folder.as_ref().to_path_buf(),
            summary_file: None,
            open_handles: DEFAULT_OPEN_HANDLES,
            always_rebuild: false,
            resident: false,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `GEOELEV_DATA_DIR` | Folder containing .tif tiles | Required |
    /// | `GEOELEV_SUMMARY_FILE` | Catalog JSON path | `<data dir>/summary.json` |
    /// | `GEOELEV_OPEN_HANDLES` | Maximum open tiles | 5 |
    /// | `GEOELEV_ALWAYS_REBUILD` | Rebuild the catalog on every start | false |
    /// | `GEOELEV_CACHE_ALL` | Load every tile into memory | false |
    ///
    /// # Errors
    ///
    /// Returns an error if `GEOELEV_DATA_DIR` is not set.
    pub fn from_env() -> Result<Self> {
        let tiles_folder = std::env::var("GEOELEV_DATA_DIR").map_err(|_| {
            ElevationError::InvalidConfig("GEOELEV_DATA_DIR environment variable not set".into())
        })?;
        let mut builder = Self::new(tiles_folder).apply_env();
        if let Ok(path) = std::env::var("GEOELEV_SUMMARY_FILE") {
            builder.summary_file = Some(PathBuf::from(path));
        }
        Ok(builder)
    }

    /// Override options from the `GEOELEV_*` variables that can be shared by
    /// several tile folders: `GEOELEV_OPEN_HANDLES`, `GEOELEV_ALWAYS_REBUILD`
    /// and `GEOELEV_CACHE_ALL`.
    pub fn apply_env(mut self) -> Self {
        if let Some(n) = std::env::var("GEOELEV_OPEN_HANDLES")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.open_handles = n;
        }
        if let Some(flag) = env_flag("GEOELEV_ALWAYS_REBUILD") {
            self.always_rebuild = flag;
        }
        if let Some(flag) = env_flag("GEOELEV_CACHE_ALL") {
            self.resident = flag;
        }
        self
    }

    /// Set where the catalog document is read from and written to.
    pub fn summary_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.summary_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the maximum number of simultaneously open tiles.
    pub fn open_handles(mut self, n: usize) -> Self {
        self.open_handles = n;
        self
    }

    /// Rebuild the catalog even if a summary document exists.
    pub fn always_rebuild(mut self, yes: bool) -> Self {
        self.always_rebuild = yes;
        self
    }

    /// Decode every tile into memory at startup.
    ///
    /// Resident lookups skip reprojection, so only use this when every tile
    /// is natively WGS84.
    pub fn resident(mut self, yes: bool) -> Self {
        self.resident = yes;
        self
    }

    /// The summary document path this builder will use.
    pub fn summary_path(&self) -> PathBuf {
        self.summary_file
            .clone()
            .unwrap_or_else(|| self.tiles_folder.join(SUMMARY_FILE_NAME))
    }

    /// Build the service.
    ///
    /// Resident services scan the folder and never touch the summary
    /// document. Streaming services load the summary if it exists and
    /// rebuilding is not forced; otherwise they scan the folder and save a
    /// fresh summary.
    ///
    /// # Errors
    ///
    /// Returns an error if `open_handles` is zero, the folder or summary
    /// cannot be read, the summary is malformed, or any tile fails to load
    /// during a scan.
    pub fn build(self) -> Result<ElevationService> {
        let capacity = NonZeroUsize::new(self.open_handles).ok_or_else(|| {
            ElevationError::InvalidConfig("open_handles must be at least 1".into())
        })?;

        if self.resident {
            let (catalog, table) = TileHandleTable::materialize(&self.tiles_folder)?;
            return Ok(ElevationService::assemble(
                self.tiles_folder,
                catalog,
                TileStore::Resident(table),
            ));
        }

        let summary = self.summary_path();
        let mut cache = TileCache::new(capacity);
        let catalog = if summary.exists() && !self.always_rebuild {
            tracing::info!(path = %summary.display(), "Re-using existing tile summary");
            Catalog::load(&summary)?
        } else {
            tracing::info!(folder = %self.tiles_folder.display(), "Creating tile summary");
            let catalog = Catalog::build(&self.tiles_folder, &mut cache)?;
            catalog.save(&summary)?;
            catalog
        };

        Ok(ElevationService::assemble(
            self.tiles_folder,
            catalog,
            TileStore::Cached(cache),
        ))
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
