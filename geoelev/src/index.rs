//! R-tree over catalogued tile bounds.
//!
//! Boxes are stored with axes `(latitude, longitude)`. The tree is bulk-loaded
//! once and never mutated, so repeated queries enumerate matches in the same
//! order; the first match is the tile a lookup uses.

use rstar::{RTree, RTreeObject, AABB};

use crate::catalog::{Catalog, TileDescriptor};

struct IndexedTile {
    descriptor: TileDescriptor,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedTile {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Point-in-box index over a [`Catalog`].
pub struct SpatialIndex {
    tree: RTree<IndexedTile>,
}

impl SpatialIndex {
    /// Index every tile of `catalog`.
    ///
    /// Corners are normalised, so a box whose minimum exceeds its maximum
    /// still indexes the area between them.
    pub fn build(catalog: &Catalog) -> Self {
        let tiles = catalog
            .tiles()
            .iter()
            .map(|descriptor| {
                let b = descriptor.bounds();
                IndexedTile {
                    descriptor: descriptor.clone(),
                    envelope: AABB::from_corners([b.lat_min, b.lng_min], [b.lat_max, b.lng_max]),
                }
            })
            .collect();

        Self {
            tree: RTree::bulk_load(tiles),
        }
    }

    /// Every tile whose box contains `(lat, lng)`, boundaries included.
    pub fn query(&self, lat: f64, lng: f64) -> Vec<&TileDescriptor> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lat, lng]))
            .map(|tile| &tile.descriptor)
            .collect()
    }

    /// The first tile [`query`](Self::query) would return.
    pub fn first_match(&self, lat: f64, lng: f64) -> Option<&TileDescriptor> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lat, lng]))
            .map(|tile| &tile.descriptor)
            .next()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
