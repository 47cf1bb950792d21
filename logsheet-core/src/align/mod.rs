use derive_builder::Builder;
use glam::Vec2;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::{
    contours::{BorderType, find_contours},
    contrast::{ThresholdType, threshold},
    distance_transform::Norm,
    edges::canny,
    filter::gaussian_blur_f32,
    geometric_transformations::{Interpolation, Projection, warp_into},
    geometry::min_area_rect,
    morphology::{dilate, erode},
};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::*;

use crate::{
    analysis::contour_area,
    consts::*,
    error::{CornersInvalidSnafu, LogsheetError, ProjectionSnafu},
};

/// Tunables of the page corner detector.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
pub struct AlignConfig {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Largest contours inspected on the first attempt.
    pub contour_budget: usize,
    pub contour_budget_step: usize,
    /// Budget at which detection stops retrying.
    pub contour_budget_cap: usize,
    /// Binarise the blurred page before edge detection.
    pub binarize: bool,
    pub threshold: u8,
    pub threshold_step: u8,
    /// Allowed deviation of an edge from the page side, as a fraction of the side.
    pub edge_tolerance: f32,
    /// Allowed disagreement of opposite edges, as a fraction of the page side.
    pub edge_consistency: f32,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            blur_sigma: CORNER_BLUR_SIGMA,
            canny_low: CORNER_CANNY_LOW,
            canny_high: CORNER_CANNY_HIGH,
            contour_budget: CONTOUR_BUDGET_START,
            contour_budget_step: CONTOUR_BUDGET_STEP,
            contour_budget_cap: CONTOUR_BUDGET_CAP,
            binarize: true,
            threshold: CORNER_THRESHOLD_START,
            threshold_step: CORNER_THRESHOLD_STEP,
            edge_tolerance: EDGE_LENGTH_TOLERANCE,
            edge_consistency: EDGE_CONSISTENCY_TOLERANCE,
        }
    }
}

/// Page corners in top-left, top-right, bottom-right, bottom-left order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corners {
    pub points: [Vec2; 4],
    /// Whether the edges passed validation.
    pub valid: bool,
    /// Contour budget of the attempt that produced these corners.
    pub contour_budget: usize,
}

/// Check that the quadrilateral spans the page.
///
/// Opposite edges must agree with each other and each edge must be close to the page side
/// it runs along.
pub fn validate_corners(
    points: &[Vec2; 4],
    width: f32,
    height: f32,
    config: &AlignConfig,
) -> bool {
    let [top_left, top_right, bottom_right, bottom_left] = *points;

    let edges_fit = |first: f32, second: f32, side: f32| {
        (first - second).abs() <= config.edge_consistency * side
            && (first - side).abs() <= config.edge_tolerance * side
            && (second - side).abs() <= config.edge_tolerance * side
    };

    let top = top_left.distance(top_right);
    let bottom = bottom_left.distance(bottom_right);
    let left = top_left.distance(bottom_left);
    let right = top_right.distance(bottom_right);

    edges_fit(top, bottom, width) && edges_fit(left, right, height)
}

fn pooled_corner_points(
    gray: &GrayImage,
    budget: usize,
    level: u8,
    config: &AlignConfig,
) -> Vec<Vec2> {
    let prepared = if config.binarize {
        threshold(gray, level, ThresholdType::Binary)
    } else {
        gray.clone()
    };

    let edges = canny(&prepared, config.canny_low, config.canny_high);
    let closed = erode(&dilate(&edges, Norm::LInf, 1), Norm::LInf, 1);

    let mut contours = find_contours::<i32>(&closed)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .filter(|contour| contour.points.len() >= 3)
        .map(|contour| (contour_area(&contour.points), contour.points))
        .collect::<Vec<_>>();
    contours.sort_by(|a, b| b.0.total_cmp(&a.0));

    contours
        .iter()
        .take(budget)
        .flat_map(|(_, points)| min_area_rect(points))
        .map(|point| Vec2::new(point.x as f32, point.y as f32))
        .collect()
}

/// Detect the four page corners of `image`.
///
/// Each attempt pools the minimum-area rectangle corners of the largest contours and picks
/// the point nearest to every image corner. Failed validations retry with a larger contour
/// budget and a higher binarisation threshold until the budget cap; the last attempt is
/// returned with its validity flag either way.
pub fn find_corners(image: &DynamicImage, config: &AlignConfig) -> Corners {
    let (width, height) = (image.width() as f32, image.height() as f32);
    let expected = [
        Vec2::new(0.0, 0.0),
        Vec2::new(width, 0.0),
        Vec2::new(width, height),
        Vec2::new(0.0, height),
    ];

    let gray = gaussian_blur_f32(&image.to_luma8(), config.blur_sigma);
    let mut budget = config.contour_budget;
    let mut level = config.threshold;

    loop {
        let pooled = pooled_corner_points(&gray, budget, level, config);
        let corners = if pooled.is_empty() {
            Corners {
                points: expected,
                valid: false,
                contour_budget: budget,
            }
        } else {
            let points = expected.map(|target| {
                pooled
                    .iter()
                    .copied()
                    .min_by(|a, b| a.distance(target).total_cmp(&b.distance(target)))
                    .unwrap_or(target)
            });
            Corners {
                points,
                valid: validate_corners(&points, width, height, config),
                contour_budget: budget,
            }
        };

        if corners.valid {
            debug!("Page corners found with contour budget {}", budget);
            return corners;
        }
        if budget >= config.contour_budget_cap || config.contour_budget_step == 0 {
            warn!("Page corners not validated after contour budget {}", budget);
            return corners;
        }

        debug!(
            "Corners not validated with budget {} and threshold {}, retrying",
            budget, level
        );
        budget = (budget + config.contour_budget_step).min(config.contour_budget_cap);
        level = level.saturating_add(config.threshold_step);
    }
}

/// Warp `scanned` so that `scanned_points` land on `template_points`, into an image of
/// `size` pixels.
///
/// Used directly when the corners were picked by hand.
pub fn align_with_points(
    scanned: &DynamicImage,
    scanned_points: &[Vec2; 4],
    template_points: &[Vec2; 4],
    size: (u32, u32),
) -> Result<DynamicImage, LogsheetError> {
    let from = scanned_points.map(|point| (point.x, point.y));
    let to = template_points.map(|point| (point.x, point.y));
    let projection = Projection::from_control_points(from, to).context(ProjectionSnafu)?;

    let mut aligned = RgbImage::new(size.0, size.1);
    warp_into(
        &scanned.to_rgb8(),
        &projection,
        Interpolation::Bilinear,
        Rgb([255, 255, 255]),
        &mut aligned,
    );
    Ok(DynamicImage::ImageRgb8(aligned))
}

/// Map a scanned page onto the template's coordinate frame.
///
/// Fails when the corners of either image cannot be validated; the page must then be
/// handled as unaligned.
pub fn align(
    scanned: &DynamicImage,
    template: &DynamicImage,
    config: &AlignConfig,
) -> Result<DynamicImage, LogsheetError> {
    let template_corners = find_corners(template, config);
    ensure!(
        template_corners.valid,
        CornersInvalidSnafu { image: "template" }
    );
    let scanned_corners = find_corners(scanned, config);
    ensure!(
        scanned_corners.valid,
        CornersInvalidSnafu { image: "scanned" }
    );

    info!(
        "Aligning {}x{} scan onto {}x{} template",
        scanned.width(),
        scanned.height(),
        template.width(),
        template.height()
    );
    trace!(
        "Control points {:?} -> {:?}",
        scanned_corners.points, template_corners.points
    );

    align_with_points(
        scanned,
        &scanned_corners.points,
        &template_corners.points,
        (template.width(), template.height()),
    )
}
