use serde::{Deserialize, Serialize};

/// A 2D axis-aligned rectangle in page pixel coordinates.
///
/// `min` is the top-left corner `(start_x, start_y)` and `max` the bottom-right corner
/// `(end_x, end_y)`; the y axis grows downwards as in image coordinates. Callers are
/// expected to keep `min <= max` on both axes.
///
/// The persisted form is the flat `[start_x, start_y, end_x, end_y]` array used by
/// logsheet configs and detection files.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Bbox {
    /// The top-left corner.
    pub min: glam::Vec2,
    /// The bottom-right corner.
    pub max: glam::Vec2,
}

impl Bbox {
    /// Creates a new bounding box from minimum and maximum points.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use logsheet_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0));
    /// ```
    pub fn new(min: glam::Vec2, max: glam::Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from `start_x, start_y, end_x, end_y`.
    ///
    /// # Example
    /// ```
    /// use logsheet_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_coords(1.0, 2.0, 6.0, 5.0);
    /// assert_eq!(bbox.width(), 5.0);
    /// assert_eq!(bbox.height(), 3.0);
    /// ```
    pub fn from_coords(start_x: f32, start_y: f32, end_x: f32, end_y: f32) -> Self {
        Self::new(
            glam::Vec2::new(start_x, start_y),
            glam::Vec2::new(end_x, end_y),
        )
    }

    /// Smallest box enclosing every point, or `None` for an empty slice.
    ///
    /// Recognition services that report quadrilaterals or polygons are reduced to their
    /// axis-aligned extent with this constructor.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use logsheet_core::analysis::bbox::Bbox;
    /// let polygon = [Vec2::new(4.0, 1.0), Vec2::new(9.0, 2.0), Vec2::new(8.0, 7.0), Vec2::new(3.0, 6.0)];
    /// let bbox = Bbox::from_points(&polygon).unwrap();
    /// assert_eq!(bbox, Bbox::from_coords(3.0, 1.0, 9.0, 7.0));
    /// ```
    pub fn from_points(points: &[glam::Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(Self::new(*first, *first), |bbox, point| {
            Self::new(bbox.min.min(*point), bbox.max.max(*point))
        }))
    }

    /// The flat `[start_x, start_y, end_x, end_y]` representation.
    pub fn coords(&self) -> [f32; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Calculates the center point of the bounding box.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use logsheet_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_coords(0.0, 0.0, 4.0, 2.0);
    /// assert_eq!(bbox.center(), Vec2::new(2.0, 1.0));
    /// ```
    pub fn center(&self) -> glam::Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Standard rectangle overlap test: the boxes are not disjoint on either axis.
    ///
    /// Touching edges count as intersecting, matching the R-tree envelope query used by
    /// [`crate::ensemble::tree::SpatialIndex`].
    ///
    /// # Example
    /// ```
    /// use logsheet_core::analysis::bbox::Bbox;
    /// let a = Bbox::from_coords(0.0, 0.0, 10.0, 10.0);
    /// assert!(a.intersects(&Bbox::from_coords(10.0, 5.0, 20.0, 6.0)));
    /// assert!(!a.intersects(&Bbox::from_coords(10.5, 5.0, 20.0, 6.0)));
    /// ```
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x < other.min.x
            || other.max.x < self.min.x
            || self.max.y < other.min.y
            || other.max.y < self.min.y)
    }

    /// Whether `point` lies inside the box, boundary included.
    pub fn contains_point(&self, point: glam::Vec2) -> bool {
        self.min.x <= point.x
            && point.x <= self.max.x
            && self.min.y <= point.y
            && point.y <= self.max.y
    }

    /// Whether `other` reaches past this box's right edge.
    pub fn exceeded_by(&self, other: &Self) -> bool {
        other.max.x > self.max.x
    }

    /// Clamps the bounding box coordinates to stay within the specified bounds.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use logsheet_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_coords(-10.0, -5.0, 1030.0, 1030.0);
    /// let clamped = bbox.clamp(Vec2::new(0.0, 0.0), Vec2::new(1023.0, 1023.0));
    /// assert_eq!(clamped.min, Vec2::new(0.0, 0.0));
    /// assert_eq!(clamped.max, Vec2::new(1023.0, 1023.0));
    /// ```
    pub fn clamp(&self, min_bounds: glam::Vec2, max_bounds: glam::Vec2) -> Self {
        Self {
            min: self.min.max(min_bounds),
            max: self.max.min(max_bounds),
        }
    }

    /// Scales both corners component-wise, e.g. relative `[0, 1]` coordinates by the page size.
    pub fn scale(&self, factor: glam::Vec2) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    /// Whether width and height agree within `error_percentage` percent of the smaller
    /// page dimension. Used to guess that an untyped region is a checkbox.
    ///
    /// # Example
    /// ```
    /// use logsheet_core::analysis::bbox::Bbox;
    /// let square = Bbox::from_coords(0.0, 0.0, 30.0, 32.0);
    /// assert!(square.is_approximately_square(1000.0, 800.0, 1.0));
    /// assert!(!square.is_approximately_square(100.0, 100.0, 1.0));
    /// ```
    pub fn is_approximately_square(
        &self,
        page_width: f32,
        page_height: f32,
        error_percentage: f32,
    ) -> bool {
        let margin_of_error = page_width.min(page_height) * (error_percentage / 100.0);
        (self.width().abs() - self.height().abs()).abs() <= margin_of_error
    }
}

impl From<[f32; 4]> for Bbox {
    fn from(coords: [f32; 4]) -> Self {
        Self::from_coords(coords[0], coords[1], coords[2], coords[3])
    }
}

impl From<Bbox> for [f32; 4] {
    fn from(bbox: Bbox) -> Self {
        bbox.coords()
    }
}

/// Capability of anything that occupies a rectangle on the page.
///
/// Regions, residuals and detections each embed a [`Bbox`]; geometric helpers take
/// `impl Bounded` instead of relying on a shared base type.
pub trait Bounded {
    fn bbox(&self) -> &Bbox;
}

impl Bounded for Bbox {
    fn bbox(&self) -> &Bbox {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_bbox_center_and_height() {
        let bbox = Bbox::from_coords(10.0, 20.0, 14.0, 26.0);
        assert_eq!(bbox.center(), Vec2::new(12.0, 23.0));
        assert_eq!(bbox.height(), 6.0);
        assert_eq!(bbox.width(), 4.0);

        // Negative coordinates
        let negative = Bbox::from_coords(-4.0, -2.0, 0.0, 2.0);
        assert_eq!(negative.center(), Vec2::new(-2.0, 0.0));
    }

    #[test]
    fn test_bbox_intersects() {
        let roi = Bbox::from_coords(0.0, 0.0, 100.0, 20.0);

        // Fully inside
        assert!(roi.intersects(&Bbox::from_coords(5.0, 5.0, 40.0, 15.0)));
        // Partially overlapping on the right
        assert!(roi.intersects(&Bbox::from_coords(90.0, 5.0, 140.0, 15.0)));
        // Sharing the bottom edge
        assert!(roi.intersects(&Bbox::from_coords(10.0, 20.0, 30.0, 40.0)));
        // Below
        assert!(!roi.intersects(&Bbox::from_coords(10.0, 21.0, 30.0, 40.0)));
        // Left of the box
        assert!(!roi.intersects(&Bbox::from_coords(-30.0, 0.0, -1.0, 20.0)));
        // Symmetric
        let other = Bbox::from_coords(90.0, 5.0, 140.0, 15.0);
        assert_eq!(roi.intersects(&other), other.intersects(&roi));
    }

    #[test]
    fn test_bbox_contains_point_is_stricter_than_overlap() {
        let residual = Bbox::from_coords(0.0, 0.0, 50.0, 20.0);

        // Grazes the residual but its center lies outside
        let grazing = Bbox::from_coords(40.0, 5.0, 90.0, 15.0);
        assert!(residual.intersects(&grazing));
        assert!(!residual.contains_point(grazing.center()));

        // Center inside
        let inside = Bbox::from_coords(10.0, 5.0, 30.0, 15.0);
        assert!(residual.contains_point(inside.center()));

        // Boundary counts as inside
        assert!(residual.contains_point(Vec2::new(50.0, 20.0)));
    }

    #[test]
    fn test_bbox_exceeded_by() {
        let roi = Bbox::from_coords(0.0, 0.0, 100.0, 20.0);
        assert!(roi.exceeded_by(&Bbox::from_coords(80.0, 0.0, 120.0, 20.0)));
        assert!(!roi.exceeded_by(&Bbox::from_coords(80.0, 0.0, 100.0, 20.0)));
        // Only the right edge matters
        assert!(!roi.exceeded_by(&Bbox::from_coords(-20.0, -5.0, 50.0, 40.0)));
    }

    #[test]
    fn test_bbox_from_points() {
        assert!(Bbox::from_points(&[]).is_none());

        let single = Bbox::from_points(&[Vec2::new(3.0, 4.0)]).unwrap();
        assert_eq!((single.width(), single.height()), (0.0, 0.0));

        let rotated_quad = [
            Vec2::new(10.0, 0.0),
            Vec2::new(20.0, 10.0),
            Vec2::new(10.0, 20.0),
            Vec2::new(0.0, 10.0),
        ];
        assert_eq!(
            Bbox::from_points(&rotated_quad).unwrap(),
            Bbox::from_coords(0.0, 0.0, 20.0, 20.0)
        );
    }

    #[test]
    fn test_bbox_serde_flat_coords() {
        let bbox: Bbox = serde_json::from_str("[1.0, 2.0, 3.5, 4.0]").unwrap();
        assert_eq!(bbox, Bbox::from_coords(1.0, 2.0, 3.5, 4.0));
        assert_eq!(serde_json::to_string(&bbox).unwrap(), "[1.0,2.0,3.5,4.0]");

        // Integer coordinates as written by the annotation tools
        let bbox: Bbox = serde_json::from_str("[10, 20, 30, 40]").unwrap();
        assert_eq!(bbox.coords(), [10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_bbox_scale_relative() {
        let relative = Bbox::from_coords(0.1, 0.25, 0.5, 0.5);
        let absolute = relative.scale(Vec2::new(1000.0, 800.0));
        assert_eq!(absolute, Bbox::from_coords(100.0, 200.0, 500.0, 400.0));
    }
}
