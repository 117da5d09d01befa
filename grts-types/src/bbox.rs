use geo::{Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned quadrant rectangle.
///
/// Coordinates follow the `(left, bottom, right, top)` order used for
/// total bounds of a point layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BBox {
    /// Create a new box from its four edges.
    ///
    /// # Examples
    ///
    /// ```
    /// use grts_types::bbox::BBox;
    ///
    /// let bbox = BBox::new(-74.0, 40.7, -73.9, 40.8);
    /// assert!((bbox.width() - 0.1).abs() < 1e-9);
    /// ```
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Create a box from a `geo::Rect`.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    /// Convert to a `geo::Rect`.
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            geo::coord! { x: self.left, y: self.bottom },
            geo::coord! { x: self.right, y: self.top },
        )
    }

    /// Convert to a closed `geo::Polygon`.
    pub fn to_polygon(&self) -> Polygon {
        self.to_rect().to_polygon()
    }

    /// Length of the x side.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Length of the y side.
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Length of the shorter side.
    pub fn min_side(&self) -> f64 {
        self.width().min(self.height())
    }

    /// Length of the longer side.
    pub fn max_side(&self) -> f64 {
        self.width().max(self.height())
    }

    pub fn centroid(&self) -> Point {
        Point::new(
            self.left + self.width() / 2.0,
            self.top - self.height() / 2.0,
        )
    }

    /// Expand the box by a given amount in all directions.
    pub fn expand(&self, amount: f64) -> Self {
        Self::new(
            self.left - amount,
            self.bottom - amount,
            self.right + amount,
            self.top + amount,
        )
    }

    /// Split the box at its midpoints.
    ///
    /// Children are returned in quadrant order:
    ///
    /// ```text
    /// 1 | 3
    /// --|--
    /// 0 | 2
    /// ```
    pub fn children(&self) -> [BBox; 4] {
        let xcenter = self.left + self.width() / 2.0;
        let ycenter = self.top - self.height() / 2.0;

        [
            BBox::new(self.left, self.bottom, xcenter, ycenter),
            BBox::new(self.left, ycenter, xcenter, self.top),
            BBox::new(xcenter, self.bottom, self.right, ycenter),
            BBox::new(xcenter, ycenter, self.right, self.top),
        ]
    }

    /// Half-open containment: `left <= x < right` and `bottom <= y < top`.
    ///
    /// Points on a shared edge between siblings belong to exactly one of them.
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.right && y >= self.bottom && y < self.top
    }

    pub fn contains_point(&self, point: &Point) -> bool {
        self.contains_xy(point.x(), point.y())
    }

    /// Euclidean distance from a point to the box outline.
    ///
    /// Interior points measure to the nearest edge, exterior points to the
    /// nearest point of the rectangle.
    pub fn boundary_distance(&self, x: f64, y: f64) -> f64 {
        let inside = x >= self.left && x <= self.right && y >= self.bottom && y <= self.top;
        if inside {
            (x - self.left)
                .min(self.right - x)
                .min(y - self.bottom)
                .min(self.top - y)
        } else {
            let dx = (self.left - x).max(0.0).max(x - self.right);
            let dy = (self.bottom - y).max(0.0).max(y - self.top);
            (dx * dx + dy * dy).sqrt()
        }
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BBox) -> Self {
        Self::new(
            self.left.min(other.left),
            self.bottom.min(other.bottom),
            self.right.max(other.right),
            self.top.max(other.top),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_cover_parent() {
        let parent = BBox::new(0.0, 0.0, 4.0, 2.0);
        let children = parent.children();

        assert_eq!(children[0], BBox::new(0.0, 0.0, 2.0, 1.0));
        assert_eq!(children[1], BBox::new(0.0, 1.0, 2.0, 2.0));
        assert_eq!(children[2], BBox::new(2.0, 0.0, 4.0, 1.0));
        assert_eq!(children[3], BBox::new(2.0, 1.0, 4.0, 2.0));

        let area: f64 = children.iter().map(|c| c.width() * c.height()).sum();
        assert_eq!(area, 8.0);
    }

    #[test]
    fn test_half_open_membership() {
        let parent = BBox::new(0.0, 0.0, 2.0, 2.0);
        let owners: Vec<usize> = parent
            .children()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.contains_xy(1.0, 1.0))
            .map(|(i, _)| i)
            .collect();

        // The center belongs to the upper-right child only
        assert_eq!(owners, vec![3]);
    }

    #[test]
    fn test_boundary_distance() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(bbox.boundary_distance(5.0, 5.0), 5.0);
        assert_eq!(bbox.boundary_distance(1.0, 5.0), 1.0);
        assert_eq!(bbox.boundary_distance(0.0, 3.0), 0.0);
        assert_eq!(bbox.boundary_distance(13.0, 14.0), 5.0);
    }

    #[test]
    fn test_rect_round_trip() {
        let bbox = BBox::new(-74.0, 40.7, -73.9, 40.8);
        assert_eq!(BBox::from_rect(bbox.to_rect()), bbox);

        let square = BBox::new(2.0, 4.0, 6.0, 8.0);
        assert_eq!(square.centroid(), Point::new(4.0, 6.0));
    }

    #[test]
    fn test_expand_and_sides() {
        let bbox = BBox::new(0.0, 0.0, 4.0, 2.0).expand(1.0);
        assert_eq!(bbox, BBox::new(-1.0, -1.0, 5.0, 3.0));
        assert_eq!(bbox.min_side(), 4.0);
        assert_eq!(bbox.max_side(), 6.0);
    }
}
