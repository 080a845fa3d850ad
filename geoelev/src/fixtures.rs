//! GeoTIFF writers shared by the unit tests.

use std::fs::File;
use std::path::{Path, PathBuf};

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// How a fixture raster is georeferenced.
pub(crate) enum Georef {
    ScaleTiepoint { scale: [f64; 3], tiepoint: [f64; 6] },
    ModelTransformation([f64; 16]),
    None,
}

/// Write a single-band `i16` GeoTIFF.
pub(crate) fn write_tile(
    path: &Path,
    width: u32,
    height: u32,
    georef: Georef,
    epsg: Option<u16>,
    samples: &[i16],
) {
    let mut file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(&mut file).unwrap();
    let mut image = encoder
        .new_image::<colortype::GrayI16>(width, height)
        .unwrap();

    match georef {
        Georef::ScaleTiepoint { scale, tiepoint } => {
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &scale[..])
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
                .unwrap();
        }
        Georef::ModelTransformation(matrix) => {
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(34264), &matrix[..])
                .unwrap();
        }
        Georef::None => {}
    }

    if let Some(epsg) = epsg {
        let key = if epsg == 4326 { 2048 } else { 3072 };
        let directory: [u16; 8] = [1, 1, 0, 1, key, 0, 1, epsg];
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(34735), &directory[..])
            .unwrap();
    }

    image.write_data(samples).unwrap();
}

/// Write a WGS84 tile with one degree pixels whose south-west corner is
/// `(lat_min, lng_min)`.
pub(crate) fn write_degree_tile(
    dir: &Path,
    name: &str,
    lat_min: f64,
    lng_min: f64,
    width: u32,
    height: u32,
    samples: &[i16],
) -> PathBuf {
    let path = dir.join(name);
    let lat_max = lat_min + height as f64;
    write_tile(
        &path,
        width,
        height,
        Georef::ScaleTiepoint {
            scale: [1.0, 1.0, 0.0],
            tiepoint: [0.0, 0.0, 0.0, lng_min, lat_max, 0.0],
        },
        Some(4326),
        samples,
    );
    path
}

/// Samples where the value encodes its position: `row * 100 + col`.
pub(crate) fn gradient(width: u32, height: u32) -> Vec<i16> {
    (0..height)
        .flat_map(|row| (0..width).map(move |col| (row * 100 + col) as i16))
        .collect()
}
