use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_text_mut},
    rect::Rect,
};
use snafu::ResultExt;
use tracing::*;

use crate::{
    analysis::bbox::Bbox,
    consts::{LABEL_FONT_SIZE, SYSTEM_FONT_PATHS},
    error::*,
    layout::element::{Detection, Roi, Service, ServiceMap},
};

fn service_color(service: Service) -> Rgb<u8> {
    match service {
        Service::Google => Rgb([0, 160, 0]),
        Service::Amazon => Rgb([230, 120, 0]),
        Service::Azure => Rgb([0, 90, 220]),
    }
}

const ROI_COLOR: Rgb<u8> = Rgb([220, 0, 0]);

/// Load the label font from `path`, or from the first common system location that parses.
///
/// `Ok(None)` means no path was given and no system font was found.
pub fn load_font(path: Option<&Path>) -> Result<Option<FontVec>, LogsheetError> {
    if let Some(path) = path {
        let data = std::fs::read(path).context(IoReadSnafu {
            path: path.to_string_lossy(),
        })?;
        return FontVec::try_from_vec(data).context(FontSnafu).map(Some);
    }

    let font = SYSTEM_FONT_PATHS.iter().find_map(|path| {
        let data = std::fs::read(path).ok()?;
        FontVec::try_from_vec(data).ok()
    });
    if font.is_none() {
        warn!("No system font found, overlay labels are skipped");
    }
    Ok(font)
}

fn draw_box(image: &mut RgbImage, bbox: &Bbox, color: Rgb<u8>, thickness: i32) {
    let x = bbox.min.x.round() as i32;
    let y = bbox.min.y.round() as i32;
    let width = bbox.width().round().max(1.0) as u32;
    let height = bbox.height().round().max(1.0) as u32;

    // Nested rectangles for thicker lines
    for offset in 0..thickness {
        let rect = Rect::at(x - offset, y - offset)
            .of_size(width + (offset * 2) as u32, height + (offset * 2) as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

/// Write `text` just above `bbox`, or inside its top edge when there is no room above.
fn draw_label(image: &mut RgbImage, bbox: &Bbox, text: &str, color: Rgb<u8>, font: &FontVec) {
    if text.is_empty() {
        return;
    }
    let x = bbox.min.x.round() as i32;
    let above = bbox.min.y.round() as i32 - LABEL_FONT_SIZE.ceil() as i32;
    let y = if above >= 0 { above } else { bbox.min.y.round() as i32 };
    draw_text_mut(image, color, x, y, PxScale::from(LABEL_FONT_SIZE), font, text);
}

/// Copy of `page` with every region and every service's detections outlined.
///
/// With a font, region varnames and detected texts are written above their boxes.
pub fn draw_overlay(
    page: &DynamicImage,
    regions: &[Roi],
    detections: &ServiceMap<Vec<Detection>>,
    font: Option<&FontVec>,
) -> RgbImage {
    let mut output = page.to_rgb8();

    for roi in regions {
        draw_box(&mut output, &roi.bbox, ROI_COLOR, 3);
        if let Some(font) = font {
            draw_label(&mut output, &roi.bbox, &roi.varname, ROI_COLOR, font);
        }
    }
    for (service, detections) in detections {
        let color = service_color(*service);
        for detection in detections {
            draw_box(&mut output, &detection.bbox, color, 1);
            if let Some(font) = font {
                draw_label(&mut output, &detection.bbox, &detection.content, color, font);
            }
        }
    }

    output
}

/// Draw the overlay and write it to `output`.
pub fn save_overlay<P: AsRef<Path>>(
    page: &DynamicImage,
    regions: &[Roi],
    detections: &ServiceMap<Vec<Detection>>,
    font: Option<&FontVec>,
    output: P,
) -> Result<(), LogsheetError> {
    draw_overlay(page, regions, detections, font)
        .save(output.as_ref())
        .context(ImageWriteSnafu {
            path: output.as_ref().to_string_lossy(),
        })
}
