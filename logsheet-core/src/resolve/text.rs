use std::sync::LazyLock;

use regex::Regex;
use tracing::*;

use crate::{
    analysis::bbox::Bbox,
    layout::element::{ContentType, Detection, ServiceMap},
    resolve::{
        CandidateValue, Candidates, ResolveConfig,
        vote::{align_pairwise, majority_vote},
    },
};

/// Detections of one service sharing a text line, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub detections: Vec<Detection>,
}

impl Line {
    fn new(mut detections: Vec<Detection>) -> Self {
        detections.sort_by(|a, b| a.bbox.center().x.total_cmp(&b.bbox.center().x));
        Self { detections }
    }

    pub fn top(&self) -> f32 {
        self.detections
            .iter()
            .map(|detection| detection.bbox.min.y)
            .fold(f32::INFINITY, f32::min)
    }

    pub fn bottom(&self) -> f32 {
        self.detections
            .iter()
            .map(|detection| detection.bbox.max.y)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn center_y(&self) -> f32 {
        (self.top() + self.bottom()) / 2.0
    }

    /// Space-joined contents.
    pub fn text(&self) -> String {
        self.detections
            .iter()
            .map(|detection| detection.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn word_count(&self) -> usize {
        self.detections
            .iter()
            .map(|detection| detection.content.split_whitespace().count())
            .sum()
    }

    fn merge(&mut self, other: Line) {
        let mut detections = std::mem::take(&mut self.detections);
        detections.extend(other.detections);
        *self = Line::new(detections);
    }
}

/// Group one service's detections into lines.
///
/// Detections are sorted by vertical center; a new line starts whenever two consecutive
/// centers are more than half the mean detection height apart.
pub fn separate_lines(mut detections: Vec<Detection>) -> Vec<Line> {
    if detections.is_empty() {
        return Vec::new();
    }

    let mean_height = detections
        .iter()
        .map(|detection| detection.bbox.height())
        .sum::<f32>()
        / detections.len() as f32;
    let max_gap = mean_height / 2.0;

    detections.sort_by(|a, b| a.bbox.center().y.total_cmp(&b.bbox.center().y));

    let mut lines = Vec::new();
    let mut current: Vec<Detection> = Vec::new();
    let mut previous_y = f32::NAN;
    for detection in detections {
        let y = detection.bbox.center().y;
        if !current.is_empty() && y - previous_y > max_gap {
            lines.push(Line::new(std::mem::take(&mut current)));
        }
        previous_y = y;
        current.push(detection);
    }
    lines.push(Line::new(current));

    lines
}

/// Lines of different services describing the same physical line.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedLineGroup {
    key: f32,
    top: f32,
    bottom: f32,
    pub lines: ServiceMap<Line>,
}

impl AlignedLineGroup {
    fn accepts(&self, line: &Line) -> bool {
        let center = line.center_y();
        (line.top() <= self.key && self.key <= line.bottom())
            || (self.top <= center && center <= self.bottom)
    }

    /// Drop the detections reaching past the region's right edge, but only when the
    /// services disagree about it.
    ///
    /// When no line or every line has an exceeding detection the group is kept whole.
    pub fn filter_exceeding(&mut self, roi: &Bbox) {
        let indicators = self
            .lines
            .values()
            .map(|line| line.detections.iter().any(|detection| roi.exceeded_by(&detection.bbox)))
            .collect::<Vec<_>>();

        let all = indicators.iter().all(|exceeding| *exceeding);
        let any = indicators.iter().any(|exceeding| *exceeding);
        if all || !any {
            return;
        }

        for line in self.lines.values_mut() {
            line.detections
                .retain(|detection| !roi.exceeded_by(&detection.bbox));
        }
    }

    /// Each service's flattened line, empty ones discarded, in service order.
    pub fn texts(&self) -> Vec<String> {
        self.lines
            .values()
            .map(Line::text)
            .filter(|text| !text.trim().is_empty())
            .collect()
    }
}

/// Associate lines across services by vertical overlap, top to bottom.
///
/// A line joins the first group whose key (the center of the line that opened it) lies
/// within the line's span, or whose span holds the line's center. A second line of a
/// service already present in the group is merged into that service's line.
pub fn align_lines(lines: ServiceMap<Vec<Line>>) -> Vec<AlignedLineGroup> {
    let mut groups: Vec<AlignedLineGroup> = Vec::new();

    for (service, service_lines) in lines {
        for line in service_lines {
            match groups.iter_mut().find(|group| group.accepts(&line)) {
                Some(group) => match group.lines.get_mut(&service) {
                    Some(existing) => existing.merge(line),
                    None => {
                        group.lines.insert(service, line);
                    }
                },
                None => groups.push(AlignedLineGroup {
                    key: line.center_y(),
                    top: line.top(),
                    bottom: line.bottom(),
                    lines: ServiceMap::from([(service, line)]),
                }),
            }
        }
    }

    groups.sort_by(|a, b| a.key.total_cmp(&b.key));
    groups
}

/// A resolved line: free text or a parsed number.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Text(String),
    Number(f64),
}

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Strip whitespace, use `.` as decimal separator and parse.
pub fn parse_number(text: &str) -> Option<f64> {
    let normalized = WHITESPACE.replace_all(text, "").replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Most frequent value among the strings that parse as numbers; ties go to the first seen.
pub fn numeric_mode<S: AsRef<str>>(strings: &[S]) -> Option<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for value in strings.iter().filter_map(|s| parse_number(s.as_ref())) {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    counts
        .into_iter()
        .fold(None, |acc: Option<(f64, usize)>, item| match acc {
            Some(best) if best.1 >= item.1 => Some(best),
            _ => Some(item),
        })
        .map(|(value, _)| value)
}

/// Resolve one aligned line from the surviving per-service strings.
pub fn identify_words(strings: &[String], content_type: ContentType) -> Option<Resolved> {
    if content_type == ContentType::Number {
        if let Some(value) = numeric_mode(strings) {
            return Some(Resolved::Number(value));
        }
    }

    let voted = match strings {
        [] => return None,
        [single] => single.clone(),
        [first, second] => majority_vote(&[
            align_pairwise(first, second),
            align_pairwise(second, first),
        ]),
        _ => {
            let variants = (0..3)
                .map(|index| {
                    let this = &strings[index];
                    let other1 = &strings[(index + 1) % 3];
                    let other2 = &strings[(index + 2) % 3];

                    let align1 = align_pairwise(this, other1);
                    let align2 = align_pairwise(this, other2);
                    align_pairwise(&align1, &align2)
                })
                .collect::<Vec<_>>();
            majority_vote(&variants)
        }
    };

    Some(Resolved::Text(voted.trim().to_string()))
}

/// Resolve a handwritten or numeric region from the detections each service placed in it.
///
/// Every service's own rendering is kept next to the inferred value so that a reviewer can
/// pick between them.
pub fn general_text_area(
    candidates: ServiceMap<Vec<Detection>>,
    roi: &Bbox,
    content_type: ContentType,
    config: &ResolveConfig,
) -> Candidates {
    let lines = candidates
        .into_iter()
        .filter(|(_, detections)| !detections.is_empty())
        .map(|(service, detections)| (service, separate_lines(detections)))
        .collect::<ServiceMap<_>>();

    let raw = lines
        .iter()
        .map(|(service, lines)| {
            let rendering = lines
                .iter()
                .map(|line| line.text().trim().to_string())
                .collect::<Vec<_>>()
                .join("\n");
            (*service, rendering)
        })
        .collect::<ServiceMap<_>>();

    if lines.is_empty() {
        return Candidates::default();
    }

    let too_complex = lines.values().any(|service_lines| {
        service_lines.len() > config.max_fusion_lines
            || service_lines
                .iter()
                .any(|line| line.word_count() > config.max_fusion_words)
    });
    if too_complex {
        debug!("Region too dense for fusion, using first service rendering");
        let inferred = raw
            .values()
            .find(|rendering| !rendering.is_empty())
            .map(|rendering| CandidateValue::Text(rendering.clone()));
        return Candidates { inferred, raw };
    }

    let resolved = align_lines(lines)
        .into_iter()
        .filter_map(|mut group| {
            group.filter_exceeding(roi);
            identify_words(&group.texts(), content_type)
        })
        .collect::<Vec<_>>();

    let inferred = match resolved.as_slice() {
        [] => None,
        [Resolved::Number(value)] => Some(CandidateValue::Number(*value)),
        _ => {
            let text = resolved
                .iter()
                .map(|line| match line {
                    Resolved::Text(text) => text.clone(),
                    Resolved::Number(value) => value.to_string(),
                })
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            (!text.is_empty()).then_some(CandidateValue::Text(text))
        }
    };

    Candidates { inferred, raw }
}
