use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LogsheetError {
    #[snafu(display("Image Read `{}` error: {}", path, source))]
    ImageRead {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Load Font error: {}", source))]
    Font { source: ab_glyph::InvalidFont },
    #[snafu(display("Image Write error: {}", source))]
    ImageWrite {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Read `{}` error: {}", path, source))]
    IoRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Write `{}` error: {}", path, source))]
    IoWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Json `{}` error: {}", stage, source))]
    Json {
        source: serde_json::Error,
        stage: String,
    },
    #[snafu(display("Unknown content type `{}` for region {}", code, index))]
    UnknownContentType { code: String, index: usize },
    #[snafu(display(
        "Region {} in `{}` has {} coordinates, expected 4",
        index,
        section,
        found
    ))]
    Coordinates {
        section: String,
        index: usize,
        found: usize,
    },
    #[snafu(display("Duplicate varname `{}`", varname))]
    DuplicateVarname { varname: String },
    #[snafu(display("Page corners of the {} image could not be validated", image))]
    CornersInvalid { image: String },
    #[snafu(display("Projection from scanned to template corners is degenerate"))]
    Projection,
}
