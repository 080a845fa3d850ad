//! Bounded LRU cache of open raster tiles.
//!
//! [`TileCache`] keeps at most `capacity` streaming tiles open, keyed by file
//! path. Acquiring a tile moves it to the most-recently-used position; opening
//! a new tile beyond capacity drops the least-recently-used one, which closes
//! its file mapping.

use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;

use crate::error::{ElevationError, Result};
use crate::tile::RasterTile;

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of tiles currently open.
    pub entry_count: u64,
    /// Number of acquisitions served by an already open tile.
    pub hit_count: u64,
    /// Number of acquisitions that opened a tile from disk.
    pub miss_count: u64,
    /// Number of tiles closed to make room for another.
    pub eviction_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Strict-recency cache of open [`RasterTile`]s.
///
/// # Example
///
/// ```ignore
/// use std::num::NonZeroUsize;
/// use geoelev::TileCache;
///
/// let mut cache = TileCache::new(NonZeroUsize::new(5).unwrap());
/// let tile = cache.acquire("tiles/n15_e105.tif".as_ref())?;
/// println!("{}", tile.lookup(15.5, 105.5));
/// ```
pub struct TileCache {
    tiles: LruCache<PathBuf, RasterTile>,
    hit_count: u64,
    miss_count: u64,
    eviction_count: u64,
}

impl TileCache {
    /// Create a cache holding at most `capacity` open tiles.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            tiles: LruCache::new(capacity),
            hit_count: 0,
            miss_count: 0,
            eviction_count: 0,
        }
    }

    /// Return the open tile for `path`, opening it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile is not cached and cannot be opened. A
    /// failed open leaves the cache unchanged.
    pub fn acquire(&mut self, path: &Path) -> Result<&mut RasterTile> {
        if self.tiles.contains(path) {
            self.hit_count += 1;
        } else {
            let tile = RasterTile::open(path)?;
            self.miss_count += 1;

            if let Some((evicted, _)) = self.tiles.push(path.to_path_buf(), tile) {
                self.eviction_count += 1;
                tracing::debug!(path = %evicted.display(), "Closed least recently used tile");
            }
        }

        self.tiles.get_mut(path).ok_or_else(|| {
            ElevationError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} missing from tile cache", path.display()),
            ))
        })
    }

    /// Whether `path` is open, without touching its recency.
    pub fn contains(&self, path: &Path) -> bool {
        self.tiles.contains(path)
    }

    /// Number of open tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Maximum number of open tiles.
    pub fn capacity(&self) -> usize {
        self.tiles.cap().get()
    }

    /// Open tile paths, most recently used first.
    pub fn paths(&self) -> Vec<&Path> {
        self.tiles.iter().map(|(path, _)| path.as_path()).collect()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.tiles.len() as u64,
            hit_count: self.hit_count,
            miss_count: self.miss_count,
            eviction_count: self.eviction_count,
        }
    }

    /// Close every open tile. Counters are kept.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }
}
