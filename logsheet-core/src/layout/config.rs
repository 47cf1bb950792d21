use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};
use tracing::*;

use crate::{
    analysis::bbox::Bbox,
    consts::SQUARE_ERROR_PERCENTAGE,
    error::*,
    layout::element::{ContentType, Residual, Roi},
};

/// Regions and residuals of one template page.
///
/// Built by the annotation tools (append/undo) or loaded from the persisted JSON document;
/// read-only while a page is being reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct LogsheetConfig {
    pub width: u32,
    pub height: u32,
    pub regions: Vec<Roi>,
    pub residuals: Vec<Residual>,
}

#[derive(Deserialize)]
struct RawConfig {
    height: u32,
    width: u32,
    #[serde(default)]
    content: Vec<RawRegion>,
    #[serde(default)]
    to_ignore: Vec<RawResidual>,
}

#[derive(Deserialize)]
struct RawRegion {
    coords: Vec<f32>,
    #[serde(default)]
    varname: Option<String>,
    #[serde(default, rename = "type")]
    content_type: Option<String>,
}

#[derive(Deserialize)]
struct RawResidual {
    coords: Vec<f32>,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct PersistedConfig<'a> {
    height: u32,
    width: u32,
    content: &'a [Roi],
    to_ignore: &'a [Residual],
}

impl LogsheetConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            regions: Vec::new(),
            residuals: Vec::new(),
        }
    }

    /// Load a persisted config document.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LogsheetError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).context(IoReadSnafu {
            path: path.to_string_lossy(),
        })?;
        Self::from_json_str(&document)
    }

    /// Parse `{height, width, content: [{coords, varname, type}], to_ignore: [{coords, content}]}`.
    ///
    /// Missing varnames are assigned from the region index, missing types are guessed from
    /// the region shape. Unknown type codes and malformed coordinates are rejected here so
    /// that reconciliation can assume a valid config.
    pub fn from_json_str(document: &str) -> Result<Self, LogsheetError> {
        let raw: RawConfig = serde_json::from_str(document).context(JsonSnafu {
            stage: "logsheet-config",
        })?;

        let mut config = Self::new(raw.width, raw.height);

        for (index, region) in raw.content.into_iter().enumerate() {
            let bbox = coords_to_bbox(&region.coords, "content", index)?;
            let content_type = match region.content_type.as_deref() {
                None | Some("") => config.guess_content_type(&bbox),
                Some(code) => ContentType::from_code(code)
                    .ok_or_else(|| LogsheetError::UnknownContentType {
                        code: code.to_string(),
                        index,
                    })?,
            };
            let varname = region
                .varname
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("roi_{index}"));
            config.regions.push(Roi::new(bbox, varname, content_type));
        }

        for (index, residual) in raw.to_ignore.into_iter().enumerate() {
            let bbox = coords_to_bbox(&residual.coords, "to_ignore", index)?;
            config.residuals.push(Residual::new(bbox, residual.content));
        }

        let mut seen = HashSet::new();
        for roi in &config.regions {
            ensure!(
                seen.insert(roi.varname.as_str()),
                DuplicateVarnameSnafu {
                    varname: roi.varname.clone()
                }
            );
        }

        debug!(
            "Loaded logsheet config {}x{} with {} regions and {} residuals",
            config.width,
            config.height,
            config.regions.len(),
            config.residuals.len()
        );

        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, LogsheetError> {
        serde_json::to_string_pretty(&PersistedConfig {
            height: self.height,
            width: self.width,
            content: &self.regions,
            to_ignore: &self.residuals,
        })
        .context(JsonSnafu {
            stage: "logsheet-config",
        })
    }

    /// Persist the config where [`LogsheetConfig::from_path`] can load it back.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), LogsheetError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_string()?).context(IoWriteSnafu {
            path: path.to_string_lossy(),
        })
    }

    /// Append a region drawn by the annotation tool.
    ///
    /// Without a content type the shape heuristic applies, without a varname the region
    /// index is used.
    pub fn add_roi(
        &mut self,
        bbox: Bbox,
        varname: Option<String>,
        content_type: Option<ContentType>,
    ) -> &Roi {
        let content_type = content_type.unwrap_or_else(|| self.guess_content_type(&bbox));
        let varname = varname.unwrap_or_else(|| format!("roi_{}", self.regions.len()));
        self.regions.push(Roi::new(bbox, varname, content_type));
        &self.regions[self.regions.len() - 1]
    }

    /// The undo command of the annotation tool: drop the most recent region.
    pub fn undo(&mut self) -> Option<Roi> {
        self.regions.pop()
    }

    pub fn add_residual(&mut self, residual: Residual) {
        self.residuals.push(residual);
    }

    pub fn get(&self, varname: &str) -> Option<&Roi> {
        self.regions.iter().find(|roi| roi.varname == varname)
    }

    fn guess_content_type(&self, bbox: &Bbox) -> ContentType {
        if bbox.is_approximately_square(
            self.width as f32,
            self.height as f32,
            SQUARE_ERROR_PERCENTAGE,
        ) {
            ContentType::Checkbox
        } else {
            ContentType::Handwritten
        }
    }
}

fn coords_to_bbox(coords: &[f32], section: &str, index: usize) -> Result<Bbox, LogsheetError> {
    match coords {
        [x0, y0, x1, y1] => Ok(Bbox::from_coords(*x0, *y0, *x1, *y1)),
        _ => CoordinatesSnafu {
            section,
            index,
            found: coords.len(),
        }
        .fail(),
    }
}
