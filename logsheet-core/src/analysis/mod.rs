use std::path::Path;

use glam::Vec2;
use image::DynamicImage;
use imageproc::point::Point;
use snafu::ResultExt;

use crate::error::*;

use self::bbox::Bbox;

pub mod bbox;

/// Decode a page image from disk.
pub fn open_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage, LogsheetError> {
    let path = path.as_ref();
    image::open(path).context(ImageReadSnafu {
        path: path.to_string_lossy(),
    })
}

/// Crop `image` to `bbox`, clamped to the image bounds.
///
/// A box that falls entirely outside the image yields a 1x1 image instead of an error so
/// that resolvers can keep going on partially visible regions.
pub fn crop_image_region(image: &DynamicImage, bbox: &Bbox) -> DynamicImage {
    let page = Vec2::new(image.width() as f32, image.height() as f32);
    let region = bbox.clamp(Vec2::ZERO, page);

    let (left, top) = (region.min.x as u32, region.min.y as u32);
    let right = (region.max.x as u32).max(left + 1).min(image.width());
    let bottom = (region.max.y as u32).max(top + 1).min(image.height());

    match (right.checked_sub(left), bottom.checked_sub(top)) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            image.crop_imm(left, top, width, height)
        }
        _ => DynamicImage::new_rgb8(1, 1),
    }
}

/// Area enclosed by a closed contour (shoelace formula).
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    let twice = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64)
        .sum::<f64>();
    twice.abs() / 2.0
}
