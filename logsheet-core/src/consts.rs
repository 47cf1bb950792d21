/// Tolerance for the "approximately square" heuristic, in percent of the smaller page side.
///
/// Regions imported without a content type whose width and height agree within this
/// margin are treated as checkboxes.
pub const SQUARE_ERROR_PERCENTAGE: f32 = 1.0;

/// Fraction of the checkbox crop trimmed from every side before counting ink.
///
/// Keeps the printed border of the box from registering as a tick.
pub const CHECKBOX_MARGIN: f32 = 0.2;

/// Fraction of dark pixels above which a checkbox counts as ticked.
pub const CHECKBOX_INK_RATIO: f32 = 0.10;

/// Luminance at or below which a checkbox pixel counts as ink.
pub const CHECKBOX_LUMA_THRESHOLD: u8 = 250;

/// Regions with more lines than this (for any service) skip cross-service fusion.
pub const MAX_FUSION_LINES: usize = 3;

/// Regions with a line holding more words than this (for any service) skip fusion.
pub const MAX_FUSION_WORDS: usize = 5;

/// Global alignment scores: match, mismatch, gap opening and gap extension.
pub const ALIGN_MATCH: i32 = 1;
pub const ALIGN_MISMATCH: i32 = 0;
pub const ALIGN_GAP_OPEN: i32 = -3;
pub const ALIGN_GAP_EXTEND: i32 = -1;

/// Filler character inserted by sequence alignment and used to pad voted strings.
pub const GAP_CHAR: char = ' ';

/// Canny thresholds used when de-skewing a barcode crop.
pub const BARCODE_CANNY_LOW: f32 = 100.0;
pub const BARCODE_CANNY_HIGH: f32 = 200.0;

/// Number of largest contours inspected on the first corner-detection attempt.
pub const CONTOUR_BUDGET_START: usize = 10;

/// Contour budget increase on every corner-detection retry.
pub const CONTOUR_BUDGET_STEP: usize = 10;

/// Contour budget after which corner detection gives up and reports its last result.
pub const CONTOUR_BUDGET_CAP: usize = 50;

/// Binarisation threshold of the first corner-detection attempt.
pub const CORNER_THRESHOLD_START: u8 = 127;

/// Binarisation threshold increase on every corner-detection retry.
pub const CORNER_THRESHOLD_STEP: u8 = 16;

/// Canny thresholds of the corner detector.
pub const CORNER_CANNY_LOW: f32 = 50.0;
pub const CORNER_CANNY_HIGH: f32 = 150.0;

/// Gaussian blur applied before corner edge detection.
pub const CORNER_BLUR_SIGMA: f32 = 1.1;

/// Allowed deviation of a detected page edge from the true page side, as a fraction.
pub const EDGE_LENGTH_TOLERANCE: f32 = 0.2;

/// Allowed disagreement between opposite page edges, as a fraction of the page side.
pub const EDGE_CONSISTENCY_TOLERANCE: f32 = 0.01;

/// Pixel height of overlay labels.
pub const LABEL_FONT_SIZE: f32 = 14.0;

/// Fonts tried for overlay labels when none is given explicitly.
pub const SYSTEM_FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];
