use glam::Vec2;
use image::{DynamicImage, imageops::FilterType};
use rayon::prelude::*;
use serde::Serialize;
use tracing::*;

use crate::{
    analysis::crop_image_region,
    ensemble::Ensemble,
    layout::{
        config::LogsheetConfig,
        element::{ContentType, Detection, Service, ServiceMap},
    },
    resolve::{ResolveConfig, RoiValue, barcode::BarcodeReader, resolve_roi},
};

/// One aligned page and what every service detected on it.
#[derive(Debug, Clone)]
pub struct PageInput {
    pub image: DynamicImage,
    pub detections: ServiceMap<Vec<Detection>>,
}

/// Resolved value of one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiResult {
    pub varname: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub value: RoiValue,
}

/// A detection no region claimed, kept for audit.
#[derive(Debug, Clone, Serialize)]
pub struct Artefact {
    pub service: Service,
    #[serde(flatten)]
    pub detection: Detection,
    #[serde(skip)]
    pub crop: DynamicImage,
}

/// Everything reconciliation produced for one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// Region results in configuration order.
    pub results: Vec<RoiResult>,
    pub artefacts: Vec<Artefact>,
    pub success_ratio: Option<f64>,
}

impl PageReport {
    pub fn get(&self, varname: &str) -> Option<&RoiValue> {
        self.results
            .iter()
            .find(|result| result.varname == varname)
            .map(|result| &result.value)
    }

    pub fn artefacts_of(&self, service: Service) -> impl Iterator<Item = &Artefact> {
        self.artefacts
            .iter()
            .filter(move |artefact| artefact.service == service)
    }
}

/// Number of regions over the largest per-service artefact count.
///
/// `None` when no service left anything unclaimed.
pub fn success_ratio(regions: usize, artefacts: &ServiceMap<Vec<Detection>>) -> Option<f64> {
    let most = artefacts.values().map(Vec::len).max().unwrap_or(0);
    (most > 0).then(|| regions as f64 / most as f64)
}

/// Reconciles pages against one logsheet template.
#[derive(Debug)]
pub struct Processor {
    config: LogsheetConfig,
    resolve: ResolveConfig,
    barcode: BarcodeReader,
}

impl Processor {
    pub fn new(config: LogsheetConfig) -> Self {
        Self::with_parts(config, ResolveConfig::default(), BarcodeReader::default())
    }

    pub fn with_parts(
        config: LogsheetConfig,
        resolve: ResolveConfig,
        barcode: BarcodeReader,
    ) -> Self {
        Self {
            config,
            resolve,
            barcode,
        }
    }

    pub fn config(&self) -> &LogsheetConfig {
        &self.config
    }

    /// Resolve every region of one page, then collect what was left over.
    pub fn process_page(&self, page: PageInput) -> PageReport {
        let span = info_span!("page", regions = self.config.regions.len());
        let _guard = span.enter();

        let PageInput {
            image,
            mut detections,
        } = page;
        let (width, height) = (self.config.width, self.config.height);
        let image = if image.width() != width || image.height() != height {
            warn!(
                "Page is {}x{} but the template is {}x{}, resizing",
                image.width(),
                image.height(),
                width,
                height
            );
            // Detections live in scan pixels and move with the image
            let factor = Vec2::new(
                width as f32 / image.width() as f32,
                height as f32 / image.height() as f32,
            );
            for detection in detections.values_mut().flatten() {
                detection.bbox = detection.bbox.scale(factor);
            }
            image.resize_exact(width, height, FilterType::Triangle)
        } else {
            image
        };

        let mut ensemble = Ensemble::new(detections, &self.config.residuals);
        let results = self
            .config
            .regions
            .iter()
            .map(|roi| {
                let candidates = ensemble.find_intersection(&roi.bbox);
                let crop = crop_image_region(&image, &roi.bbox).to_luma8();
                let value = resolve_roi(roi, &crop, candidates, &self.barcode, &self.resolve);
                RoiResult {
                    varname: roi.varname.clone(),
                    content_type: roi.content_type,
                    value,
                }
            })
            .collect::<Vec<_>>();

        let leftovers = ensemble.filter_artefacts();
        let success_ratio = success_ratio(results.len(), &leftovers);
        let artefacts = leftovers
            .into_iter()
            .flat_map(|(service, detections)| {
                detections.into_iter().map(move |detection| (service, detection))
            })
            .map(|(service, detection)| Artefact {
                service,
                crop: crop_image_region(&image, &detection.bbox),
                detection,
            })
            .collect::<Vec<_>>();

        info!(
            "Resolved {} regions, {} artefacts left",
            results.len(),
            artefacts.len()
        );
        PageReport {
            results,
            artefacts,
            success_ratio,
        }
    }

    /// Reconcile independent pages in parallel, each with its own ensemble.
    pub fn process_pages(&self, pages: Vec<PageInput>) -> Vec<PageReport> {
        pages
            .into_par_iter()
            .map(|page| self.process_page(page))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::bbox::Bbox, resolve::CandidateValue};

    #[test]
    fn test_success_ratio() {
        let artefacts = ServiceMap::from([
            (
                Service::Google,
                vec![
                    Detection::new(Bbox::from_coords(0.0, 0.0, 1.0, 1.0), "a"),
                    Detection::new(Bbox::from_coords(0.0, 0.0, 1.0, 1.0), "b"),
                ],
            ),
            (Service::Amazon, Vec::new()),
        ]);
        assert_eq!(success_ratio(4, &artefacts), Some(2.0));

        let clean = ServiceMap::from([(Service::Google, Vec::new())]);
        assert_eq!(success_ratio(4, &clean), None);
        assert_eq!(success_ratio(4, &ServiceMap::new()), None);
    }

    #[test]
    fn test_page_resized_to_template() {
        let mut config = LogsheetConfig::new(100, 50);
        config.add_roi(
            Bbox::from_coords(10.0, 10.0, 60.0, 30.0),
            Some("site".to_string()),
            Some(ContentType::Handwritten),
        );
        config.add_roi(
            Bbox::from_coords(60.0, 30.0, 80.0, 40.0),
            Some("count".to_string()),
            Some(ContentType::Number),
        );
        let processor = Processor::new(config);

        // Scanned at twice the template resolution, detections in scan pixels
        let report = processor.process_page(PageInput {
            image: DynamicImage::new_rgb8(200, 100),
            detections: ServiceMap::from([(
                Service::Google,
                vec![
                    Detection::new(Bbox::from_coords(24.0, 24.0, 100.0, 56.0), "Lagoon"),
                    Detection::new(Bbox::from_coords(124.0, 62.0, 156.0, 78.0), "7"),
                    Detection::new(Bbox::from_coords(166.0, 84.0, 196.0, 96.0), "stray"),
                ],
            )]),
        });

        match report.get("count") {
            Some(RoiValue::Candidates(candidates)) => {
                assert_eq!(candidates.raw[&Service::Google], "7");
                assert_eq!(candidates.inferred, Some(CandidateValue::Number(7.0)));
            }
            other => panic!("unexpected value {other:?}"),
        }
        match report.get("site") {
            Some(RoiValue::Candidates(candidates)) => {
                assert_eq!(candidates.raw[&Service::Google], "Lagoon");
            }
            other => panic!("unexpected value {other:?}"),
        }

        assert_eq!(report.artefacts.len(), 1);
        let artefact = &report.artefacts[0];
        assert_eq!(artefact.detection.content, "stray");
        assert_eq!(artefact.detection.bbox, Bbox::from_coords(83.0, 42.0, 98.0, 48.0));
        assert_eq!((artefact.crop.width(), artefact.crop.height()), (15, 6));
        assert_eq!(report.success_ratio, Some(2.0));
    }

    #[test]
    fn test_process_pages_keeps_pages_apart() {
        let mut config = LogsheetConfig::new(100, 50);
        config.add_roi(
            Bbox::from_coords(0.0, 0.0, 100.0, 50.0),
            Some("all".to_string()),
            Some(ContentType::Handwritten),
        );
        let processor = Processor::new(config);

        let page = |content: &str| PageInput {
            image: DynamicImage::new_rgb8(100, 50),
            detections: ServiceMap::from([(
                Service::Amazon,
                vec![Detection::new(Bbox::from_coords(5.0, 5.0, 40.0, 20.0), content)],
            )]),
        };

        let reports = processor.process_pages(vec![page("first"), page("second")]);
        let texts = reports
            .iter()
            .map(|report| match report.get("all") {
                Some(RoiValue::Candidates(candidates)) => candidates.raw[&Service::Amazon].clone(),
                other => panic!("unexpected value {other:?}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(reports.iter().all(|report| report.artefacts.is_empty()));
    }
}
