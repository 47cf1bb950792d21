use derive_builder::Builder;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    consts::*,
    layout::element::{ContentType, Detection, Roi, ServiceMap},
};

use self::barcode::BarcodeReader;

pub mod barcode;
pub mod checkbox;
pub mod text;
pub mod vote;

/// Tunables of the content resolvers.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
pub struct ResolveConfig {
    /// Fraction of the checkbox crop trimmed on every side.
    pub checkbox_margin: f32,
    /// Share of dark pixels above which a checkbox is ticked.
    pub checkbox_ink_ratio: f32,
    /// Luminance at or below which a pixel counts as ink.
    pub checkbox_luma_threshold: u8,
    pub max_fusion_lines: usize,
    pub max_fusion_words: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            checkbox_margin: CHECKBOX_MARGIN,
            checkbox_ink_ratio: CHECKBOX_INK_RATIO,
            checkbox_luma_threshold: CHECKBOX_LUMA_THRESHOLD,
            max_fusion_lines: MAX_FUSION_LINES,
            max_fusion_words: MAX_FUSION_WORDS,
        }
    }
}

/// Consensus value of a text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateValue {
    Number(f64),
    Text(String),
}

/// The inferred value of a text region next to each service's own rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidates {
    pub inferred: Option<CandidateValue>,
    #[serde(flatten)]
    pub raw: ServiceMap<String>,
}

/// Resolved value of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoiValue {
    Candidates(Candidates),
    Checkbox(bool),
    Barcode(Option<String>),
}

/// Dispatch a region to the resolver of its content type.
///
/// `crop` is the region's pixels; only the checkbox and barcode resolvers look at it.
pub fn resolve_roi(
    roi: &Roi,
    crop: &GrayImage,
    candidates: ServiceMap<Vec<Detection>>,
    barcode: &BarcodeReader,
    config: &ResolveConfig,
) -> RoiValue {
    let value = match roi.content_type {
        ContentType::Checkbox => RoiValue::Checkbox(checkbox::is_ticked(crop, config)),
        ContentType::Barcode => RoiValue::Barcode(barcode.resolve(crop, &candidates)),
        ContentType::Handwritten | ContentType::Number => RoiValue::Candidates(
            text::general_text_area(candidates, &roi.bbox, roi.content_type, config),
        ),
    };
    debug!("Resolved {} to {:?}", roi, value);
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::bbox::Bbox, layout::element::Service};
    use image::Luma;

    #[test]
    fn test_config_builder() {
        let config = ResolveConfigBuilder::default()
            .checkbox_ink_ratio(0.3)
            .build()
            .unwrap();
        assert_eq!(config.checkbox_ink_ratio, 0.3);
        assert_eq!(config.checkbox_margin, CHECKBOX_MARGIN);
        assert_eq!(config.max_fusion_words, MAX_FUSION_WORDS);
    }

    #[test]
    fn test_dispatch_by_content_type() {
        let crop = GrayImage::from_pixel(30, 30, Luma([255]));
        let reader = BarcodeReader::default();
        let config = ResolveConfig::default();
        let candidates = || {
            ServiceMap::from([(
                Service::Google,
                vec![Detection::new(Bbox::from_coords(2.0, 2.0, 20.0, 12.0), "7")],
            )])
        };

        let bbox = Bbox::from_coords(0.0, 0.0, 30.0, 30.0);
        let checkbox = Roi::new(bbox, "ticked", ContentType::Checkbox);
        assert_eq!(
            resolve_roi(&checkbox, &crop, candidates(), &reader, &config),
            RoiValue::Checkbox(false)
        );

        let number = Roi::new(bbox, "count", ContentType::Number);
        let RoiValue::Candidates(result) =
            resolve_roi(&number, &crop, candidates(), &reader, &config)
        else {
            panic!("number region must resolve to candidates");
        };
        assert_eq!(result.inferred, Some(CandidateValue::Number(7.0)));

        // A blank crop decodes nothing and the single reading wins the vote
        let code = Roi::new(bbox, "sample", ContentType::Barcode);
        assert_eq!(
            resolve_roi(&code, &crop, candidates(), &reader, &config),
            RoiValue::Barcode(Some("7".to_string()))
        );
    }

    #[test]
    fn test_value_serialization() {
        let value = RoiValue::Candidates(Candidates {
            inferred: Some(CandidateValue::Number(12.5)),
            raw: ServiceMap::from([(Service::Google, "12,5".to_string())]),
        });
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"inferred":12.5,"google":"12,5"}"#
        );
        assert_eq!(
            serde_json::to_string(&RoiValue::Barcode(None)).unwrap(),
            "null"
        );
        assert_eq!(
            serde_json::to_string(&RoiValue::Checkbox(true)).unwrap(),
            "true"
        );
    }
}
