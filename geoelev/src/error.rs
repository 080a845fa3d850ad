//! Error types for the geoelev library.
//!
//! There are two families: [`ElevationError`]
//! is raised while tiles, catalogs and services are being loaded and aborts
//! startup for a tier; [`LookupFault`] describes why a single lookup could not
//! produce a sample and is mapped to sea level by
//! [`ElevationService::lookup`](crate::ElevationService::lookup).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading tiles, catalogs or services.
#[derive(Error, Debug)]
pub enum ElevationError {
    /// IO error when reading or writing files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The raster could not be decoded as a TIFF.
    #[error("Failed to decode raster {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    /// The raster carries no model transformation, pixel scale or tiepoint tags.
    #[error("Raster {path} has no geotransform")]
    MissingGeoTransform { path: PathBuf },

    /// The raster's geotransform cannot be inverted.
    #[error("Singular geotransform in {path}: {coefficients:?}")]
    SingularGeoTransform {
        path: PathBuf,
        coefficients: [f64; 6],
    },

    /// The catalog document could not be parsed or written.
    #[error("Catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service was configured with an unusable value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reasons a single lookup produced no sample.
///
/// None of these escape [`ElevationService::lookup`](crate::ElevationService::lookup);
/// they are logged and replaced by [`SEA_LEVEL`](crate::SEA_LEVEL).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupFault {
    /// No catalogued tile contains the point.
    #[error("No tile covers lat={lat}, lng={lng}")]
    OutOfCoverage { lat: f64, lng: f64 },

    /// The point maps outside the raster grid of the matching tile.
    #[error("Pixel ({pixel}, {line}) is outside the {width}x{height} raster")]
    PixelOutOfRange {
        pixel: i64,
        line: i64,
        width: usize,
        height: usize,
    },

    /// Reprojection from WGS84 into the raster's native CRS failed.
    #[error("Reprojection to EPSG:{epsg} failed: {message}")]
    Projection { epsg: u16, message: String },

    /// The tile could not be opened or its pixel data could not be decoded.
    #[error("Decode fault: {0}")]
    Decode(String),
}

impl From<ElevationError> for LookupFault {
    fn from(err: ElevationError) -> Self {
        LookupFault::Decode(err.to_string())
    }
}

impl From<tiff::TiffError> for LookupFault {
    fn from(err: tiff::TiffError) -> Self {
        LookupFault::Decode(err.to_string())
    }
}

/// Result type alias using [`ElevationError`].
pub type Result<T> = std::result::Result<T, ElevationError>;

/// Result type alias for request-time lookups.
pub type LookupResult<T> = std::result::Result<T, LookupFault>;
