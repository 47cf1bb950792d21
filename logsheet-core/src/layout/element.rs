use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::analysis::bbox::{Bbox, Bounded};

/// The recognition services whose outputs are reconciled.
///
/// The declaration order is the fixed service order used for every tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Google,
    Amazon,
    Azure,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Google, Service::Amazon, Service::Azure];

    pub fn name(&self) -> &'static str {
        match self {
            Service::Google => "google",
            Service::Amazon => "amazon",
            Service::Azure => "azure",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per service, iterated in [`Service`] order.
pub type ServiceMap<T> = BTreeMap<Service, T>;

/// What kind of value a region holds, which selects its resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Handwritten,
    Checkbox,
    Barcode,
    Number,
}

impl ContentType {
    /// Parse a persisted content type, either the full name or its one-letter code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Handwritten" | "h" => Some(ContentType::Handwritten),
            "Checkbox" | "c" => Some(ContentType::Checkbox),
            "Barcode" | "b" => Some(ContentType::Barcode),
            "Number" | "n" => Some(ContentType::Number),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContentType::Handwritten => "Handwritten",
            ContentType::Checkbox => "Checkbox",
            ContentType::Barcode => "Barcode",
            ContentType::Number => "Number",
        }
    }
}

/// A text fragment reported by one recognition service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "coords")]
    pub bbox: Bbox,
    pub content: String,
}

impl Detection {
    pub fn new(bbox: Bbox, content: impl Into<String>) -> Self {
        Self {
            bbox,
            content: content.into(),
        }
    }

    /// Build a detection from polygon vertices in absolute pixels.
    ///
    /// Content is repaired with `plsfix`; fragments that end up blank are dropped.
    pub fn from_polygon(points: &[glam::Vec2], content: &str) -> Option<Self> {
        let bbox = Bbox::from_points(points)?;
        Self::cleaned(bbox, content)
    }

    /// Build a detection from a box given relative to the page size (`[0, 1]` on each axis).
    pub fn from_relative(relative: Bbox, page_size: glam::Vec2, content: &str) -> Option<Self> {
        Self::cleaned(relative.scale(page_size), content)
    }

    pub(crate) fn cleaned(bbox: Bbox, content: &str) -> Option<Self> {
        let content = plsfix::fix_text(content, None);
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(Self::new(bbox, content))
    }
}

impl Bounded for Detection {
    fn bbox(&self) -> &Bbox {
        &self.bbox
    }
}

/// Pre-printed template text that is never a field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residual {
    #[serde(rename = "coords")]
    pub bbox: Bbox,
    #[serde(rename = "content")]
    pub expected_content: String,
}

impl Residual {
    pub fn new(bbox: Bbox, expected_content: impl Into<String>) -> Self {
        Self {
            bbox,
            expected_content: expected_content.into(),
        }
    }
}

impl Bounded for Residual {
    fn bbox(&self) -> &Bbox {
        &self.bbox
    }
}

/// A named, typed field of the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    #[serde(rename = "coords")]
    pub bbox: Bbox,
    pub varname: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

impl Roi {
    pub fn new(bbox: Bbox, varname: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            bbox,
            varname: varname.into(),
            content_type,
        }
    }
}

impl Bounded for Roi {
    fn bbox(&self) -> &Bbox {
        &self.bbox
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x0, y0, x1, y1] = self.bbox.coords();
        write!(
            f,
            "Region {}: ({x0}, {y0}) ({x1}, {y1}) - {}",
            self.varname,
            self.content_type.name()
        )
    }
}
