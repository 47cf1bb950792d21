use std::path::Path;

use snafu::ResultExt;

use crate::{error::*, layout::element::Detection};

pub mod config;
pub mod element;

/// Read one service's detections from a JSON array of `{coords, content}` objects.
///
/// Content is cleaned the same way the polygon and relative constructors clean it, and
/// blank fragments are dropped.
pub fn read_detections<P: AsRef<Path>>(path: P) -> Result<Vec<Detection>, LogsheetError> {
    let path = path.as_ref();
    let document = std::fs::read_to_string(path).context(IoReadSnafu {
        path: path.to_string_lossy(),
    })?;
    let raw: Vec<Detection> = serde_json::from_str(&document).context(JsonSnafu {
        stage: "detections",
    })?;

    Ok(raw
        .into_iter()
        .filter_map(|detection| Detection::cleaned(detection.bbox, &detection.content))
        .collect())
}
