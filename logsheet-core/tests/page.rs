use image::{DynamicImage, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut},
    rect::Rect,
};

use logsheet_core::{
    CandidateValue, Candidates, Detection, LogsheetConfig, PageInput, PageReport, Processor,
    RoiValue, Service, ServiceMap, analysis::bbox::Bbox,
};

const CONFIG: &str = r#"{
    "width": 400,
    "height": 200,
    "content": [
        {"coords": [10, 10, 150, 40], "varname": "site", "type": "h"},
        {"coords": [140, 10, 260, 40], "varname": "note", "type": "Handwritten"},
        {"coords": [10, 60, 150, 90], "varname": "count", "type": "n"},
        {"coords": [200, 60, 280, 100], "varname": "sample", "type": "b"},
        {"coords": [300, 20, 340, 60], "varname": "ticked"},
        {"coords": [300, 90, 340, 130], "varname": "empty", "type": "c"}
    ],
    "to_ignore": [
        {"coords": [300, 150, 380, 190], "content": "Page 1"}
    ]
}"#;

fn detection(coords: [f32; 4], content: &str) -> Detection {
    Detection::new(Bbox::from(coords), content)
}

fn page_image() -> DynamicImage {
    let mut image = RgbImage::from_pixel(400, 200, Rgb([255, 255, 255]));
    for y in [20, 90] {
        draw_hollow_rect_mut(&mut image, Rect::at(300, y).of_size(40, 40), Rgb([0, 0, 0]));
    }
    // Tick the upper box
    draw_filled_rect_mut(&mut image, Rect::at(306, 26).of_size(28, 28), Rgb([20, 20, 20]));
    DynamicImage::ImageRgb8(image)
}

fn page_detections() -> ServiceMap<Vec<Detection>> {
    ServiceMap::from([
        (
            Service::Google,
            vec![
                detection([20.0, 12.0, 100.0, 38.0], "Lagoon"),
                detection([170.0, 12.0, 250.0, 38.0], "North"),
                detection([20.0, 62.0, 60.0, 88.0], "12,5"),
                detection([210.0, 65.0, 270.0, 95.0], "S-42"),
                detection([310.0, 160.0, 370.0, 180.0], "Page 1"),
                detection([20.0, 150.0, 60.0, 170.0], "smudge"),
            ],
        ),
        (
            Service::Amazon,
            vec![
                detection([21.0, 13.0, 99.0, 37.0], "Lagoon"),
                detection([171.0, 13.0, 249.0, 37.0], "North"),
                detection([20.0, 63.0, 58.0, 87.0], "125"),
                detection([212.0, 66.0, 268.0, 94.0], "S-42"),
            ],
        ),
        (
            Service::Azure,
            vec![
                // Reaches into "note" as well
                detection([20.0, 12.0, 145.0, 38.0], "Lag0on"),
                detection([150.0, 160.0, 170.0, 175.0], "zz"),
            ],
        ),
    ])
}

fn candidates<'a>(report: &'a PageReport, varname: &str) -> &'a Candidates {
    match report.get(varname) {
        Some(RoiValue::Candidates(candidates)) => candidates,
        other => panic!("{varname} resolved to {other:?}"),
    }
}

fn process() -> PageReport {
    let config = LogsheetConfig::from_json_str(CONFIG).unwrap();
    Processor::new(config).process_page(PageInput {
        image: page_image(),
        detections: page_detections(),
    })
}

#[test]
fn test_text_regions() {
    let report = process();

    let site = candidates(&report, "site");
    assert_eq!(site.inferred, Some(CandidateValue::Text("Lagoon".to_string())));
    assert_eq!(site.raw[&Service::Azure], "Lag0on");

    let count = candidates(&report, "count");
    assert_eq!(count.inferred, Some(CandidateValue::Number(12.5)));
    assert_eq!(count.raw[&Service::Google], "12,5");
    assert_eq!(count.raw[&Service::Amazon], "125");
}

#[test]
fn test_detection_claimed_once() {
    let report = process();

    // The wide Azure fragment went to "site", which is resolved first
    let note = candidates(&report, "note");
    assert!(!note.raw.contains_key(&Service::Azure));
    assert_eq!(note.inferred, Some(CandidateValue::Text("North".to_string())));

    let seen = report
        .results
        .iter()
        .filter_map(|result| match &result.value {
            RoiValue::Candidates(candidates) => candidates.raw.get(&Service::Azure),
            _ => None,
        })
        .filter(|raw| raw.contains("Lag0on"))
        .count();
    assert_eq!(seen, 1);
}

#[test]
fn test_checkbox_and_barcode_regions() {
    let report = process();

    assert_eq!(report.get("ticked"), Some(&RoiValue::Checkbox(true)));
    assert_eq!(report.get("empty"), Some(&RoiValue::Checkbox(false)));
    // Nothing decodes from a blank crop, so the services' agreeing reading is used
    assert_eq!(
        report.get("sample"),
        Some(&RoiValue::Barcode(Some("S-42".to_string())))
    );
}

#[test]
fn test_artefacts_exclude_residuals() {
    let report = process();

    let google = report
        .artefacts_of(Service::Google)
        .map(|artefact| artefact.detection.content.as_str())
        .collect::<Vec<_>>();
    assert_eq!(google, vec!["smudge"]);
    assert_eq!(report.artefacts_of(Service::Amazon).count(), 0);

    let azure = report.artefacts_of(Service::Azure).collect::<Vec<_>>();
    assert_eq!(azure.len(), 1);
    assert_eq!((azure[0].crop.width(), azure[0].crop.height()), (20, 15));

    assert_eq!(report.success_ratio, Some(6.0));
}

#[test]
fn test_results_follow_config_order() {
    let report = process();
    let order = report
        .results
        .iter()
        .map(|result| result.varname.as_str())
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["site", "note", "count", "sample", "ticked", "empty"]);
}

#[test]
fn test_report_json() {
    let report = process();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["results"][2]["varname"], "count");
    assert_eq!(json["results"][2]["type"], "Number");
    assert_eq!(json["results"][2]["value"]["inferred"], 12.5);
    assert_eq!(json["results"][4]["value"], true);
    assert_eq!(json["artefacts"][0]["service"], "google");
    assert_eq!(json["artefacts"][0]["content"], "smudge");
}

#[test]
fn test_config_from_disk_and_parallel_pages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logsheet.json");
    std::fs::write(&path, CONFIG).unwrap();

    let processor = Processor::new(LogsheetConfig::from_path(&path).unwrap());
    let pages = (0..3)
        .map(|_| PageInput {
            image: page_image(),
            detections: page_detections(),
        })
        .collect();

    let reports = processor.process_pages(pages);
    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert_eq!(
            candidates(report, "count").inferred,
            Some(CandidateValue::Number(12.5))
        );
        assert_eq!(report.artefacts.len(), 2);
    }
}
