//! Tile catalog: which raster files exist and what they cover.
//!
//! A [`Catalog`] is built once per tile folder by opening every `.tif` file,
//! or loaded from a previously saved summary JSON document:
//!
//! ```text
//! [
//!   {"file": "tiles/a.tif", "coords": [10.0, 20.0, 100.0, 110.0]},
//!   ...
//! ]
//! ```
//!
//! `coords` are `[lat_min, lat_max, lng_min, lng_max]`. Tile ids are not
//! stored; they are assigned 1..n in document order.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cache::TileCache;
use crate::error::Result;
use crate::geotransform::Corners;
use crate::tile::RasterTile;

/// Identifier of a catalogued tile, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic extent of a tile in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl TileBounds {
    /// Bounds from `[lat_min, lat_max, lng_min, lng_max]`.
    pub fn from_coords(coords: [f64; 4]) -> Self {
        let [lat_min, lat_max, lng_min, lng_max] = coords;
        Self {
            lat_min,
            lat_max,
            lng_min,
            lng_max,
        }
    }

    /// The persisted `[lat_min, lat_max, lng_min, lng_max]` form.
    pub fn coords(&self) -> [f64; 4] {
        [self.lat_min, self.lat_max, self.lng_min, self.lng_max]
    }
}

impl From<Corners> for TileBounds {
    fn from(corners: Corners) -> Self {
        Self {
            lat_min: corners.bottom_right.1,
            lat_max: corners.top_right.1,
            lng_min: corners.top_left.0,
            lng_max: corners.top_right.0,
        }
    }
}

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDescriptor {
    id: TileId,
    file: PathBuf,
    bounds: TileBounds,
}

impl TileDescriptor {
    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn bounds(&self) -> TileBounds {
        self.bounds
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogRecord {
    file: PathBuf,
    coords: [f64; 4],
}

/// Ordered list of catalogued tiles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    tiles: Vec<TileDescriptor>,
}

impl Catalog {
    /// Build a catalog from `(file, bounds)` pairs, assigning ids in order.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (PathBuf, TileBounds)>,
    {
        let tiles = entries
            .into_iter()
            .enumerate()
            .map(|(i, (file, bounds))| TileDescriptor {
                id: TileId(i as u32 + 1),
                file,
                bounds,
            })
            .collect();
        Self { tiles }
    }

    /// List the `.tif` files directly inside `folder`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be read.
    pub fn tile_files(folder: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            let path = entry.path();
            let is_tif = path.extension().is_some_and(|ext| ext == "tif");
            if is_tif && entry.file_type()?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Walk the `.tif` files of `folder`, letting `visit` open each one and
    /// report its bounds.
    ///
    /// # Errors
    ///
    /// Returns the first error from listing the folder or from `visit`.
    pub fn scan<F>(folder: &Path, mut visit: F) -> Result<Self>
    where
        F: FnMut(TileId, &Path) -> Result<TileBounds>,
    {
        let files = Catalog::tile_files(folder)?;
        let mut entries = Vec::with_capacity(files.len());

        for (i, file) in files.into_iter().enumerate() {
            let id = TileId(i as u32 + 1);
            let size_mb = megabytes(fs::metadata(&file)?.len());
            tracing::info!(
                id = %id,
                path = %file.display(),
                size_mb = %format!("{:.2}", size_mb),
                "Processing tile"
            );

            let bounds = visit(id, &file)?;
            tracing::info!(
                id = %id,
                lat_min = bounds.lat_min,
                lat_max = bounds.lat_max,
                lng_min = bounds.lng_min,
                lng_max = bounds.lng_max,
                "Catalogued tile"
            );
            entries.push((file, bounds));
        }

        Ok(Catalog::from_entries(entries))
    }

    /// Build the catalog of `folder`, opening each tile through `cache`.
    ///
    /// The cache's capacity applies during the scan, so at most that many
    /// tiles are open at once and the most recent ones stay open afterwards.
    pub fn build(folder: &Path, cache: &mut TileCache) -> Result<Self> {
        let start = Instant::now();
        let catalog = Catalog::scan(folder, |_, path| Ok(cache.acquire(path)?.bounds()))?;
        tracing::info!(
            folder = %folder.display(),
            tiles = catalog.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built tile catalog"
        );
        Ok(catalog)
    }

    /// Serialize to the summary JSON document.
    pub fn to_json(&self) -> Result<String> {
        let records: Vec<CatalogRecord> = self
            .tiles
            .iter()
            .map(|tile| CatalogRecord {
                file: tile.file.clone(),
                coords: tile.bounds.coords(),
            })
            .collect();
        Ok(serde_json::to_string(&records)?)
    }

    /// Parse a summary JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ElevationError::Json`](crate::ElevationError::Json) if the
    /// document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<CatalogRecord> = serde_json::from_str(json)?;
        Ok(Catalog::from_entries(records.into_iter().map(|record| {
            (record.file, TileBounds::from_coords(record.coords))
        })))
    }

    /// Write the summary JSON document to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), tiles = self.len(), "Saved tile summary");
        Ok(())
    }

    /// Read a summary JSON document from `path` without opening any raster.
    pub fn load(path: &Path) -> Result<Self> {
        let catalog = Catalog::from_json(&fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), tiles = catalog.len(), "Loaded tile summary");
        Ok(catalog)
    }

    pub fn tiles(&self) -> &[TileDescriptor] {
        &self.tiles
    }

    /// Look up a descriptor by id.
    pub fn get(&self, id: TileId) -> Option<&TileDescriptor> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.tiles.get(index)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Resident tiles keyed by catalog id.
#[derive(Debug, Default)]
pub struct TileHandleTable {
    tiles: HashMap<TileId, RasterTile>,
}

impl TileHandleTable {
    /// Open every tile in `folder`, decode it into memory and return the
    /// resulting catalog alongside the table.
    ///
    /// No summary document is read or written.
    pub fn materialize(folder: &Path) -> Result<(Catalog, Self)> {
        let start = Instant::now();
        let mut tiles = HashMap::new();

        let catalog = Catalog::scan(folder, |id, path| {
            let tile = RasterTile::open(path)?;
            let bounds = tile.bounds();
            tiles.insert(id, tile.into_resident()?);
            Ok(bounds)
        })?;

        tracing::info!(
            folder = %folder.display(),
            tiles = tiles.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Materialized resident tiles"
        );
        Ok((catalog, Self { tiles }))
    }

    pub fn get_mut(&mut self, id: TileId) -> Option<&mut RasterTile> {
        self.tiles.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
