//! Affine mapping between raster pixel/line and projected coordinates.

/// GDAL-style affine geotransform with its precomputed inverse.
///
/// Coefficients are `[origin_x, pixel_width, row_rotation, origin_y,
/// column_rotation, pixel_height]`, so that
///
/// ```text
/// x = gt[0] + pixel * gt[1] + line * gt[2]
/// y = gt[3] + pixel * gt[4] + line * gt[5]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    coefficients: [f64; 6],
    inverse: [f64; 6],
}

/// Corner coordinates of a raster in its native CRS, as `(x, y)` pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corners {
    pub top_left: (f64, f64),
    pub top_right: (f64, f64),
    pub bottom_left: (f64, f64),
    pub bottom_right: (f64, f64),
}

impl GeoTransform {
    /// Build a transform from GDAL-ordered coefficients.
    ///
    /// Returns `None` if the transform is singular (zero or non-finite
    /// determinant).
    pub fn new(coefficients: [f64; 6]) -> Option<Self> {
        let gt = coefficients;
        let det = gt[1] * gt[5] - gt[2] * gt[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        // Origin terms are kept as-is; the pixel/line solve subtracts them first.
        let inverse = [
            gt[0],
            gt[5] / det,
            -gt[2] / det,
            gt[3],
            -gt[4] / det,
            gt[1] / det,
        ];

        Some(Self {
            coefficients,
            inverse,
        })
    }

    /// The forward coefficients in GDAL order.
    pub fn coefficients(&self) -> [f64; 6] {
        self.coefficients
    }

    /// Map a projected coordinate to integer pixel/line indices.
    ///
    /// Fractional positions are truncated toward zero, not rounded, so no
    /// half-cell correction is applied. Negative results are possible for
    /// points west of or above the raster origin.
    pub fn pixel_line(&self, x: f64, y: f64) -> (i64, i64) {
        let inv = &self.inverse;
        let u = x - inv[0];
        let v = y - inv[3];
        let pixel = inv[1] * u + inv[2] * v;
        let line = inv[4] * u + inv[5] * v;
        (pixel as i64, line as i64)
    }

    /// Corner coordinates of a `width` x `height` raster.
    ///
    /// Rotation terms are ignored, matching how tile bounds are catalogued.
    pub fn corners(&self, width: usize, height: usize) -> Corners {
        let gt = &self.coefficients;
        let (ulx, uly) = (gt[0], gt[3]);
        let lrx = ulx + width as f64 * gt[1];
        let lry = uly + height as f64 * gt[5];
        Corners {
            top_left: (ulx, uly),
            top_right: (lrx, uly),
            bottom_left: (ulx, lry),
            bottom_right: (lrx, lry),
        }
    }
}

/// Coefficients from GeoTIFF `ModelPixelScaleTag` and `ModelTiepointTag`.
///
/// The tiepoint ties raster point `(i, j)` to model point `(x, y)`; rows grow
/// southwards so the pixel height is the negated Y scale.
pub fn scale_tiepoint_coefficients(scale: [f64; 3], tiepoint: [f64; 6]) -> [f64; 6] {
    let [i, j, _k, x, y, _z] = tiepoint;
    [
        x - i * scale[0],
        scale[0],
        0.0,
        y + j * scale[1],
        0.0,
        -scale[1],
    ]
}

/// Coefficients from the 4x4 row-major GeoTIFF `ModelTransformationTag`.
pub fn model_transformation_coefficients(matrix: &[f64]) -> Option<[f64; 6]> {
    if matrix.len() < 8 {
        return None;
    }
    Some([
        matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_degree_tile() -> GeoTransform {
        // lng 100..110, lat 10..20, 1 degree per pixel
        GeoTransform::new([100.0, 1.0, 0.0, 20.0, 0.0, -1.0]).unwrap()
    }

    #[test]
    fn test_singular_transform_rejected() {
        assert!(GeoTransform::new([0.0, 0.0, 0.0, 0.0, 0.0, -1.0]).is_none());
        assert!(GeoTransform::new([0.0, 1.0, 1.0, 0.0, 1.0, 1.0]).is_none());
        assert!(GeoTransform::new([0.0, f64::NAN, 0.0, 0.0, 0.0, -1.0]).is_none());
    }

    #[test]
    fn test_pixel_line_truncates() {
        let gt = one_degree_tile();
        assert_eq!(gt.pixel_line(105.0, 15.0), (5, 5));
        assert_eq!(gt.pixel_line(105.99, 15.01), (5, 4));
        assert_eq!(gt.pixel_line(100.0, 20.0), (0, 0));
    }

    #[test]
    fn test_pixel_line_truncates_toward_zero() {
        let gt = one_degree_tile();
        // Half a pixel west of the origin still truncates to column 0.
        assert_eq!(gt.pixel_line(99.5, 19.5).0, 0);
        assert_eq!(gt.pixel_line(98.5, 19.5).0, -1);
    }

    #[test]
    fn test_scale_tiepoint_coefficients() {
        let coefficients =
            scale_tiepoint_coefficients([1.0, 1.0, 0.0], [0.0, 0.0, 0.0, 100.0, 20.0, 0.0]);
        assert_eq!(GeoTransform::new(coefficients), Some(one_degree_tile()));

        // Tiepoint anchored at raster (2, 3) instead of the origin
        let coefficients =
            scale_tiepoint_coefficients([0.5, 0.5, 0.0], [2.0, 3.0, 0.0, 101.0, 18.5, 0.0]);
        assert_eq!(coefficients, [100.0, 0.5, 0.0, 20.0, 0.0, -0.5]);

        let singular =
            scale_tiepoint_coefficients([0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 100.0, 20.0, 0.0]);
        assert!(GeoTransform::new(singular).is_none());
    }

    #[test]
    fn test_model_transformation_coefficients() {
        let matrix = [
            1.0, 0.0, 0.0, 100.0, //
            0.0, -1.0, 0.0, 20.0, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let coefficients = model_transformation_coefficients(&matrix).unwrap();
        assert_eq!(GeoTransform::new(coefficients), Some(one_degree_tile()));
        assert!(model_transformation_coefficients(&matrix[..4]).is_none());
    }

    #[test]
    fn test_corners() {
        let corners = one_degree_tile().corners(10, 10);
        assert_eq!(corners.top_left, (100.0, 20.0));
        assert_eq!(corners.top_right, (110.0, 20.0));
        assert_eq!(corners.bottom_left, (100.0, 10.0));
        assert_eq!(corners.bottom_right, (110.0, 10.0));
    }
}
