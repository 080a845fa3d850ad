//! GeoTIFF tile access and elevation sampling.
//!
//! This module provides [`RasterTile`], a single georeferenced raster that can
//! be sampled at WGS84 coordinates. A tile is either *streaming* (memory-mapped
//! and decoded one chunk at a time, with reprojection into the raster's native
//! CRS) or *resident* (band 1 fully decoded into memory, no reprojection).

use std::fmt;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::TiffResult;

use crate::catalog::TileBounds;
use crate::error::{ElevationError, LookupFault, LookupResult, Result};
use crate::geotransform::{
    model_transformation_coefficients, scale_tiepoint_coefficients, Corners, GeoTransform,
};
use crate::projection::{epsg_from_geokeys, CoordinateTransform, WGS84_EPSG};

/// Elevation reported when no sample is available.
pub const SEA_LEVEL: i32 = 0;

/// Sample value marking a void cell.
pub const NO_DATA: i16 = -32768;

const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;

type TileDecoder = Decoder<Cursor<Mmap>>;

/// A single georeferenced elevation raster.
///
/// # Example
///
/// ```ignore
/// use geoelev::RasterTile;
///
/// let mut tile = RasterTile::open("tiles/n15_e105.tif")?;
/// let bounds = tile.bounds();
/// let elevation = tile.lookup(15.5, 105.5);
/// println!("{:?}: {}m", bounds, elevation);
/// ```
pub struct RasterTile {
    /// Source file; `None` once the tile is resident
    path: Option<PathBuf>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    epsg: u16,
    source: TileSource,
}

enum TileSource {
    Streaming(StreamingSource),
    /// Band 1, row-major, `width * height` samples
    Resident(Vec<i16>),
}

struct StreamingSource {
    decoder: TileDecoder,
    projection: CoordinateTransform,
    chunk_width: usize,
    chunk_height: usize,
    chunks_across: usize,
    last_chunk: Option<DecodedChunk>,
}

/// The most recently decoded chunk of a streaming tile.
struct DecodedChunk {
    index: u32,
    width: usize,
    samples_per_pixel: usize,
    data: Vec<i16>,
}

/// Summary of the band 1 values of a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileStatistics {
    pub min: Option<i16>,
    pub max: Option<i16>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub no_data_count: usize,
}

impl RasterTile {
    /// Open a GeoTIFF for streaming access.
    ///
    /// The file is memory-mapped and its georeferencing read from the
    /// `ModelTransformationTag`, or from `ModelPixelScaleTag` plus
    /// `ModelTiepointTag`. A missing `GeoKeyDirectoryTag` is treated as WGS84.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a TIFF, carries no
    /// geotransform, or has a geotransform that cannot be inverted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decode_err = |source| ElevationError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path)?;
        // SAFETY: Memory mapping is safe as long as the file is not modified
        // while mapped. Tile folders are treated as read-only.
        let mmap = unsafe { Mmap::map(&file)? };

        let mut decoder = Decoder::new(Cursor::new(mmap))
            .map_err(decode_err)?
            .with_limits(Limits::unlimited());
        let (width, height) = decoder.dimensions().map_err(decode_err)?;

        let coefficients =
            read_coefficients(&mut decoder).ok_or_else(|| ElevationError::MissingGeoTransform {
                path: path.to_path_buf(),
            })?;
        let transform = GeoTransform::new(coefficients).ok_or_else(|| {
            ElevationError::SingularGeoTransform {
                path: path.to_path_buf(),
                coefficients,
            }
        })?;

        let epsg = decoder
            .get_tag_u16_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))
            .ok()
            .and_then(|keys| epsg_from_geokeys(&keys))
            .unwrap_or(WGS84_EPSG);

        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        let chunk_width = (chunk_width as usize).max(1);
        let chunk_height = (chunk_height as usize).max(1);

        tracing::debug!(
            path = %path.display(),
            width,
            height,
            epsg,
            chunk_width,
            chunk_height,
            "Opened raster tile"
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            width: width as usize,
            height: height as usize,
            transform,
            epsg,
            source: TileSource::Streaming(StreamingSource {
                decoder,
                projection: CoordinateTransform::from_wgs84(epsg),
                chunk_width,
                chunk_height,
                chunks_across: (width as usize).div_ceil(chunk_width),
                last_chunk: None,
            }),
        })
    }

    /// Decode band 1 into memory and release the file.
    ///
    /// Resident tiles sample with the WGS84 coordinate directly; no
    /// reprojection is applied even if the raster's CRS is projected.
    /// Calling this on a tile that is already resident is a no-op.
    pub fn into_resident(self) -> Result<Self> {
        match self.source {
            TileSource::Resident(_) => Ok(self),
            TileSource::Streaming(mut stream) => {
                let path = self.path.unwrap_or_default();
                let grid = read_band(&mut stream.decoder, self.width, self.height).map_err(
                    |source| ElevationError::Decode {
                        path: path.clone(),
                        source,
                    },
                )?;
                drop(stream);

                tracing::debug!(
                    path = %path.display(),
                    samples = grid.len(),
                    "Materialized resident tile"
                );

                Ok(Self {
                    path: None,
                    width: self.width,
                    height: self.height,
                    transform: self.transform,
                    epsg: self.epsg,
                    source: TileSource::Resident(grid),
                })
            }
        }
    }

    /// Sample the elevation at a WGS84 coordinate.
    ///
    /// Void cells ([`NO_DATA`]) are reported as [`SEA_LEVEL`].
    ///
    /// # Errors
    ///
    /// Returns a [`LookupFault`] if reprojection fails, the point maps outside
    /// the raster grid, or the pixel data cannot be decoded.
    pub fn sample(&mut self, lat: f64, lng: f64) -> LookupResult<i32> {
        let (x, y) = match &self.source {
            TileSource::Streaming(stream) => stream.projection.transform(lng, lat)?,
            TileSource::Resident(_) => (lng, lat),
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(LookupFault::Projection {
                epsg: self.epsg,
                message: format!("non-finite coordinate ({}, {})", x, y),
            });
        }

        let (pixel, line) = self.transform.pixel_line(x, y);
        let in_range =
            (0..self.width as i64).contains(&pixel) && (0..self.height as i64).contains(&line);
        if !in_range {
            return Err(LookupFault::PixelOutOfRange {
                pixel,
                line,
                width: self.width,
                height: self.height,
            });
        }
        let (pixel, line) = (pixel as usize, line as usize);

        let value = match &mut self.source {
            TileSource::Streaming(stream) => stream.read_sample(pixel, line)?,
            TileSource::Resident(grid) => {
                grid.get(line * self.width + pixel).copied().ok_or_else(|| {
                    LookupFault::Decode(format!(
                        "resident grid holds {} samples, wanted ({}, {})",
                        grid.len(),
                        pixel,
                        line
                    ))
                })?
            }
        };

        if value == NO_DATA {
            Ok(SEA_LEVEL)
        } else {
            Ok(i32::from(value))
        }
    }

    /// Sample the elevation at a WGS84 coordinate, falling back to
    /// [`SEA_LEVEL`] on any fault.
    pub fn lookup(&mut self, lat: f64, lng: f64) -> i32 {
        match self.sample(lat, lng) {
            Ok(elevation) => elevation,
            Err(fault) => {
                tracing::warn!(
                    path = ?self.path,
                    lat,
                    lng,
                    error = %fault,
                    "Tile lookup failed"
                );
                SEA_LEVEL
            }
        }
    }

    /// Corner coordinates in the raster's native CRS.
    pub fn corners(&self) -> Corners {
        self.transform.corners(self.width, self.height)
    }

    /// Bounding box derived from the corner coordinates.
    pub fn bounds(&self) -> TileBounds {
        TileBounds::from(self.corners())
    }

    /// Compute min/max/mean over band 1, ignoring [`NO_DATA`] cells.
    ///
    /// Streaming tiles decode the full band for this; resident tiles reuse
    /// their grid.
    pub fn statistics(&mut self) -> Result<TileStatistics> {
        let decoded;
        let values: &[i16] = match &mut self.source {
            TileSource::Resident(grid) => grid,
            TileSource::Streaming(stream) => {
                decoded = read_band(&mut stream.decoder, self.width, self.height).map_err(
                    |source| ElevationError::Decode {
                        path: self.path.clone().unwrap_or_default(),
                        source,
                    },
                )?;
                &decoded
            }
        };
        Ok(TileStatistics::from_samples(values))
    }

    /// Source file, or `None` for resident tiles.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raster width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in lines.
    pub fn height(&self) -> usize {
        self.height
    }

    /// EPSG code of the native CRS.
    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    /// Affine transform from pixel/line to native coordinates.
    pub fn geo_transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Whether band 1 is held in memory.
    pub fn is_resident(&self) -> bool {
        matches!(self.source, TileSource::Resident(_))
    }
}

impl fmt::Debug for RasterTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterTile")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("epsg", &self.epsg)
            .field("resident", &self.is_resident())
            .finish()
    }
}

impl StreamingSource {
    fn read_sample(&mut self, pixel: usize, line: usize) -> LookupResult<i16> {
        let index = ((line / self.chunk_height) * self.chunks_across
            + pixel / self.chunk_width) as u32;

        let stale = self
            .last_chunk
            .as_ref()
            .map_or(true, |chunk| chunk.index != index);
        if stale {
            let (chunk_width, chunk_height) = self.decoder.chunk_data_dimensions(index);
            let data = decoded_to_i16(self.decoder.read_chunk(index)?);
            let pixels = chunk_width as usize * chunk_height as usize;
            self.last_chunk = Some(DecodedChunk {
                index,
                width: chunk_width as usize,
                samples_per_pixel: samples_per_pixel(data.len(), pixels),
                data,
            });
        }

        let Some(chunk) = &self.last_chunk else {
            return Err(LookupFault::Decode(format!("chunk {} not decoded", index)));
        };
        let offset = ((line % self.chunk_height) * chunk.width + pixel % self.chunk_width)
            * chunk.samples_per_pixel;
        chunk.data.get(offset).copied().ok_or_else(|| {
            LookupFault::Decode(format!(
                "offset {} outside chunk {} ({} samples)",
                offset,
                index,
                chunk.data.len()
            ))
        })
    }
}

impl TileStatistics {
    fn from_samples(values: &[i16]) -> Self {
        let mut min = None;
        let mut max = None;
        let mut sum = 0i64;
        let mut valid_count = 0;
        let mut no_data_count = 0;

        for &v in values {
            if v == NO_DATA {
                no_data_count += 1;
                continue;
            }
            min = Some(min.map_or(v, |m: i16| m.min(v)));
            max = Some(max.map_or(v, |m: i16| m.max(v)));
            sum += i64::from(v);
            valid_count += 1;
        }

        Self {
            min,
            max,
            mean: (valid_count > 0).then(|| sum as f64 / valid_count as f64),
            valid_count,
            no_data_count,
        }
    }
}

fn read_coefficients(decoder: &mut TileDecoder) -> Option<[f64; 6]> {
    if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION))
    {
        if let Some(coefficients) = model_transformation_coefficients(&matrix) {
            return Some(coefficients);
        }
    }

    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    let scale = [scale[0], scale[1], scale.get(2).copied().unwrap_or(0.0)];
    let tiepoint = [
        tiepoint[0],
        tiepoint[1],
        tiepoint[2],
        tiepoint[3],
        tiepoint[4],
        tiepoint[5],
    ];
    Some(scale_tiepoint_coefficients(scale, tiepoint))
}

/// Decode the whole image and keep the first sample of every pixel.
fn read_band(decoder: &mut TileDecoder, width: usize, height: usize) -> TiffResult<Vec<i16>> {
    let data = decoded_to_i16(decoder.read_image()?);
    let stride = samples_per_pixel(data.len(), width * height);
    if stride == 1 {
        Ok(data)
    } else {
        Ok(data.into_iter().step_by(stride).collect())
    }
}

fn samples_per_pixel(samples: usize, pixels: usize) -> usize {
    if pixels == 0 {
        1
    } else {
        (samples / pixels).max(1)
    }
}

fn decoded_to_i16(result: DecodingResult) -> Vec<i16> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(i16::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(|x| x as i16).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as i16).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as i16).collect(),
        DecodingResult::I8(v) => v.into_iter().map(i16::from).collect(),
        DecodingResult::I16(v) => v,
        DecodingResult::I32(v) => v.into_iter().map(|x| x as i16).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as i16).collect(),
        DecodingResult::F16(v) => v.into_iter().map(|x| x.to_f32() as i16).collect(),
        DecodingResult::F32(v) => v.into_iter().map(|x| x as i16).collect(),
        DecodingResult::F64(v) => v.into_iter().map(|x| x as i16).collect(),
    }
}
