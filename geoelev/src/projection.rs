//! WGS84 to native CRS reprojection for streaming tiles.
//!
//! Projection definitions come from the `crs-definitions` EPSG database and
//! are evaluated with `proj4rs`, so no system PROJ installation is needed.

use std::fmt;

use proj4rs::proj::Proj;

use crate::error::{LookupFault, LookupResult};

/// EPSG code of the geographic WGS84 reference system.
pub const WGS84_EPSG: u16 = 4326;

/// GeoKey holding the EPSG code of a projected CRS.
const GEO_KEY_PROJECTED_CRS: u16 = 3072;

/// GeoKey holding the EPSG code of a geographic CRS.
const GEO_KEY_GEOGRAPHIC_TYPE: u16 = 2048;

/// Extract the EPSG code from a GeoTIFF `GeoKeyDirectoryTag` payload.
///
/// The directory is a header of four shorts followed by `(key, location,
/// count, value)` quadruples. Only keys stored inline (location 0) are
/// considered; a projected CRS wins over a geographic one.
pub fn epsg_from_geokeys(directory: &[u16]) -> Option<u16> {
    if directory.len() < 4 {
        return None;
    }
    let num_keys = directory[3] as usize;

    let mut geographic = None;
    for entry in directory[4..].chunks_exact(4).take(num_keys) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 {
            continue;
        }
        match key {
            GEO_KEY_PROJECTED_CRS => return Some(value),
            GEO_KEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }
    geographic
}

/// Transformation from WGS84 longitude/latitude into a raster's native CRS.
pub enum CoordinateTransform {
    /// The raster is already in WGS84.
    Identity,
    /// A proj4rs pipeline between two EPSG definitions.
    Proj {
        epsg: u16,
        source: Box<Proj>,
        target: Box<Proj>,
        target_geographic: bool,
    },
    /// The native CRS could not be set up; every transform reports `reason`.
    Unsupported { epsg: u16, reason: String },
}

impl CoordinateTransform {
    /// Build the transform from WGS84 into `epsg`.
    ///
    /// Failures are deferred: an unknown or unparsable CRS yields
    /// [`CoordinateTransform::Unsupported`], which faults at lookup time
    /// rather than preventing the tile from loading.
    pub fn from_wgs84(epsg: u16) -> Self {
        if epsg == WGS84_EPSG {
            return CoordinateTransform::Identity;
        }

        let Some(target_def) = crs_definitions::from_code(epsg) else {
            return CoordinateTransform::Unsupported {
                epsg,
                reason: "not in the EPSG database".to_string(),
            };
        };
        let Some(source_def) = crs_definitions::from_code(WGS84_EPSG) else {
            return CoordinateTransform::Unsupported {
                epsg,
                reason: "WGS84 definition missing".to_string(),
            };
        };

        let source = match Proj::from_proj_string(source_def.proj4) {
            Ok(p) => p,
            Err(e) => {
                return CoordinateTransform::Unsupported {
                    epsg,
                    reason: format!("invalid WGS84 definition: {:?}", e),
                }
            }
        };
        let target = match Proj::from_proj_string(target_def.proj4) {
            Ok(p) => p,
            Err(e) => {
                return CoordinateTransform::Unsupported {
                    epsg,
                    reason: format!("invalid definition: {:?}", e),
                }
            }
        };

        CoordinateTransform::Proj {
            epsg,
            source: Box::new(source),
            target: Box::new(target),
            target_geographic: target_def.proj4.contains("+proj=longlat"),
        }
    }

    /// EPSG code of the target CRS.
    pub fn epsg(&self) -> u16 {
        match self {
            CoordinateTransform::Identity => WGS84_EPSG,
            CoordinateTransform::Proj { epsg, .. } | CoordinateTransform::Unsupported { epsg, .. } => {
                *epsg
            }
        }
    }

    /// Transform a WGS84 `(lng, lat)` in degrees into native `(x, y)`.
    pub fn transform(&self, lng: f64, lat: f64) -> LookupResult<(f64, f64)> {
        match self {
            CoordinateTransform::Identity => Ok((lng, lat)),
            CoordinateTransform::Proj {
                epsg,
                source,
                target,
                target_geographic,
            } => {
                // proj4rs works in radians for geographic systems
                let mut point = (lng.to_radians(), lat.to_radians(), 0.0);
                proj4rs::transform::transform(source, target, &mut point).map_err(|e| {
                    LookupFault::Projection {
                        epsg: *epsg,
                        message: format!("{:?}", e),
                    }
                })?;

                if *target_geographic {
                    Ok((point.0.to_degrees(), point.1.to_degrees()))
                } else {
                    Ok((point.0, point.1))
                }
            }
            CoordinateTransform::Unsupported { epsg, reason } => Err(LookupFault::Projection {
                epsg: *epsg,
                message: reason.clone(),
            }),
        }
    }
}

impl fmt::Debug for CoordinateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateTransform::Identity => write!(f, "Identity"),
            CoordinateTransform::Proj { epsg, .. } => write!(f, "Proj(EPSG:{})", epsg),
            CoordinateTransform::Unsupported { epsg, reason } => {
                write!(f, "Unsupported(EPSG:{}, {})", epsg, reason)
            }
        }
    }
}
