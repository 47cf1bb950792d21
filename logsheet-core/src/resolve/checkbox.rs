use image::GrayImage;
use tracing::*;

use crate::resolve::ResolveConfig;

/// Decide whether a checkbox crop is ticked.
///
/// A margin is trimmed on every side to drop the printed frame, then the share of dark
/// pixels in what remains is compared against the configured ink ratio.
pub fn is_ticked(crop: &GrayImage, config: &ResolveConfig) -> bool {
    let (width, height) = crop.dimensions();
    let margin_x = (width as f32 * config.checkbox_margin).round() as u32;
    let margin_y = (height as f32 * config.checkbox_margin).round() as u32;

    let inner_width = width.saturating_sub(2 * margin_x);
    let inner_height = height.saturating_sub(2 * margin_y);
    if inner_width == 0 || inner_height == 0 {
        warn!("Checkbox crop {}x{} too small to inspect", width, height);
        return false;
    }

    let mut ink = 0usize;
    for y in margin_y..margin_y + inner_height {
        for x in margin_x..margin_x + inner_width {
            if crop.get_pixel(x, y)[0] <= config.checkbox_luma_threshold {
                ink += 1;
            }
        }
    }

    let ratio = ink as f32 / (inner_width * inner_height) as f32;
    trace!("Checkbox ink ratio {:.3}", ratio);
    ratio > config.checkbox_ink_ratio
}
