use image::{GrayImage, Luma, imageops};
use imageproc::{
    contours::{BorderType, find_contours},
    edges::canny,
    geometric_transformations::{Interpolation, rotate_about_center},
    geometry::min_area_rect,
};
use tracing::*;

use crate::{
    analysis::contour_area,
    consts::{BARCODE_CANNY_HIGH, BARCODE_CANNY_LOW},
    layout::element::{Detection, ServiceMap},
};

/// A pixel-level symbol decoder.
pub trait SymbolDecoder: Send + Sync {
    fn name(&self) -> &str;

    /// Text of the first symbol found in `image`.
    fn decode(&self, image: &GrayImage) -> Option<String>;
}

/// Multi-format decoder backed by `rxing` (1D and 2D symbologies).
#[derive(Debug, Default, Clone, Copy)]
pub struct RxingDecoder;

impl SymbolDecoder for RxingDecoder {
    fn name(&self) -> &str {
        "rxing"
    }

    fn decode(&self, image: &GrayImage) -> Option<String> {
        let (width, height) = image.dimensions();
        match rxing::helpers::detect_in_luma(image.as_raw().clone(), width, height, None) {
            Ok(result) => Some(result.getText().to_string()),
            Err(e) => {
                trace!("rxing found nothing: {}", e);
                None
            }
        }
    }
}

/// QR decoder backed by `rqrr`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl SymbolDecoder for RqrrDecoder {
    fn name(&self) -> &str {
        "rqrr"
    }

    fn decode(&self, image: &GrayImage) -> Option<String> {
        let (width, height) = image.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                image.get_pixel(x as u32, y as u32)[0]
            });

        prepared
            .detect_grids()
            .into_iter()
            .find_map(|grid| grid.decode().ok().map(|(_, content)| content))
    }
}

/// The barcode fallback chain: primary decoder, secondary decoder, then the primary
/// decoder again on a de-skewed crop.
pub struct BarcodeReader {
    primary: Box<dyn SymbolDecoder>,
    secondary: Box<dyn SymbolDecoder>,
}

impl Default for BarcodeReader {
    fn default() -> Self {
        Self::new(Box::new(RxingDecoder), Box::new(RqrrDecoder))
    }
}

impl std::fmt::Debug for BarcodeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarcodeReader")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.name())
            .finish()
    }
}

impl BarcodeReader {
    pub fn new(primary: Box<dyn SymbolDecoder>, secondary: Box<dyn SymbolDecoder>) -> Self {
        Self { primary, secondary }
    }

    /// Decode the symbol in `crop`, trying every stage of the chain in turn.
    pub fn read(&self, crop: &GrayImage) -> Option<String> {
        if let Some(text) = self.primary.decode(crop) {
            debug!("Barcode decoded by {}", self.primary.name());
            return Some(text);
        }
        if let Some(text) = self.secondary.decode(crop) {
            debug!("Barcode decoded by {}", self.secondary.name());
            return Some(text);
        }

        let Some(angle) = estimate_skew(crop) else {
            debug!("No contour to de-skew the barcode crop");
            return None;
        };
        debug!("Retrying barcode after de-skewing by {:.2} degrees", -angle);
        self.primary.decode(&rotate_replicating(crop, -angle.to_radians()))
    }

    /// Resolve a barcode region.
    ///
    /// Pixel decoding only runs when the region looks like one isolated symbol; when it
    /// fails the services' own readings are voted on instead.
    pub fn resolve(
        &self,
        crop: &GrayImage,
        candidates: &ServiceMap<Vec<Detection>>,
    ) -> Option<String> {
        if !check_barcode_area(candidates) {
            debug!("Barcode region does not hold a single isolated symbol");
            return None;
        }

        self.read(crop)
            .or_else(|| vote_single_candidates(candidates))
    }
}

/// At most one candidate per service and at least one overall.
pub fn check_barcode_area(candidates: &ServiceMap<Vec<Detection>>) -> bool {
    let counts = candidates.values().map(Vec::len).collect::<Vec<_>>();
    counts.iter().all(|count| *count <= 1) && counts.iter().sum::<usize>() >= 1
}

/// Most frequent text among services that found exactly one object; ties go to the
/// earlier service.
pub fn vote_single_candidates(candidates: &ServiceMap<Vec<Detection>>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for detections in candidates.values() {
        let [detection] = detections.as_slice() else {
            continue;
        };
        let text = detection.content.as_str();
        match counts.iter_mut().find(|(seen, _)| *seen == text) {
            Some((_, count)) => *count += 1,
            None => counts.push((text, 1)),
        }
    }

    counts
        .into_iter()
        .fold(None, |acc: Option<(&str, usize)>, item| match acc {
            Some(best) if best.1 >= item.1 => Some(best),
            _ => Some(item),
        })
        .map(|(text, _)| text.to_string())
}

/// Rotate `crop` about its center, filling the uncovered corners with the nearest edge pixels.
pub fn rotate_replicating(crop: &GrayImage, theta: f32) -> GrayImage {
    let (width, height) = crop.dimensions();
    if width == 0 || height == 0 {
        return crop.clone();
    }
    // Enough border that no rotated sample reaches the fill value
    let pad = width.max(height) / 2 + 2;
    let padded = GrayImage::from_fn(width + 2 * pad, height + 2 * pad, |x, y| {
        let source_x = x.saturating_sub(pad).min(width - 1);
        let source_y = y.saturating_sub(pad).min(height - 1);
        *crop.get_pixel(source_x, source_y)
    });

    let rotated = rotate_about_center(&padded, theta, Interpolation::Bicubic, Luma([255u8]));
    imageops::crop_imm(&rotated, pad, pad, width, height).to_image()
}

/// Rotation of the dominant edge contour in degrees, normalised to `(-45, 45]`.
///
/// Positive angles mean the symbol is turned clockwise on the page.
pub fn estimate_skew(crop: &GrayImage) -> Option<f32> {
    let edges = canny(crop, BARCODE_CANNY_LOW, BARCODE_CANNY_HIGH);
    let contours = find_contours::<i32>(&edges);

    let largest = contours
        .iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .filter(|contour| contour.points.len() >= 3)
        .max_by(|a, b| contour_area(&a.points).total_cmp(&contour_area(&b.points)))?;

    let rect = min_area_rect(&largest.points);
    let dx = (rect[1].x - rect[0].x) as f32;
    let dy = (rect[1].y - rect[0].y) as f32;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }

    let mut angle = dy.atan2(dx).to_degrees();
    while angle > 45.0 {
        angle -= 90.0;
    }
    while angle <= -45.0 {
        angle += 90.0;
    }
    Some(angle)
}
