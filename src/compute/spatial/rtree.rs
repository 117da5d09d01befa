//! R*-tree backed spatial indexes.
//!
//! [`RTreeIndex`] indexes dataset points and answers the quadrant membership
//! queries used while splitting and sampling. Membership is half-open
//! (`left <= x < right`, `bottom <= y < top`): the R-tree envelope query is
//! inclusive on every edge, so candidates on the right or top edge are
//! filtered out afterwards. A point on the line shared by two sibling
//! quadrants is therefore counted once.
//!
//! [`QuadrantIndex`] indexes quadrant rectangles and answers the
//! nearest-quadrant queries used by cluster weighting.
//!
//! ## Example
//!
//! ```rust
//! use grts::compute::spatial::{RTreeIndex, SpatialIndex};
//! use grts::{BBox, PointDataset};
//!
//! let dataset = PointDataset::from_xy(vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).unwrap();
//! let index = RTreeIndex::from_dataset(&dataset);
//!
//! assert_eq!(index.intersect(&BBox::new(0.0, 0.0, 2.0, 2.0)), vec![0, 1]);
//! assert_eq!(index.nearest(1.9, 1.9, 1), vec![2]);
//! ```

use super::SpatialIndex;
use crate::dataset::PointDataset;
use grts_types::bbox::BBox;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{Point as RstarPoint, RTree};

/// 2D point for R-tree indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    pub x: f64,
    pub y: f64,
    pub id: usize,
}

impl IndexedPoint {
    pub fn new(x: f64, y: f64, id: usize) -> Self {
        Self { x, y, id }
    }
}

impl RstarPoint for IndexedPoint {
    type Scalar = f64;
    const DIMENSIONS: usize = 2;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self {
            x: generator(0),
            y: generator(1),
            id: 0,
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.x,
            1 => self.y,
            _ => unreachable!(),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => unreachable!(),
        }
    }
}

/// Point index over a [`PointDataset`], keyed by row position.
pub struct RTreeIndex {
    tree: RTree<IndexedPoint>,
}

impl RTreeIndex {
    pub fn from_dataset(dataset: &PointDataset) -> Self {
        let points = dataset
            .points()
            .iter()
            .enumerate()
            .map(|(id, p)| IndexedPoint::new(p.x(), p.y(), id))
            .collect();

        Self {
            tree: RTree::bulk_load(points),
        }
    }

    /// Up to `k` point ids with their Euclidean distance to `(x, y)`, nearest first.
    pub fn nearest_with_distance(&self, x: f64, y: f64, k: usize) -> Vec<(usize, f64)> {
        if !x.is_finite() || !y.is_finite() {
            log::warn!("Rejecting nearest-point query at non-finite ({}, {})", x, y);
            return Vec::new();
        }

        let query_point = IndexedPoint::new(x, y, 0);
        self.tree
            .nearest_neighbor_iter_with_distance_2(&query_point)
            .take(k)
            .map(|(point, distance_2)| (point.id, distance_2.sqrt()))
            .collect()
    }
}

impl SpatialIndex for RTreeIndex {
    fn intersect(&self, bbox: &BBox) -> Vec<usize> {
        if ![bbox.left, bbox.bottom, bbox.right, bbox.top]
            .iter()
            .all(|v| v.is_finite())
        {
            log::warn!("Rejecting quadrant query with non-finite edges");
            return Vec::new();
        }

        let min_corner = IndexedPoint::new(bbox.left, bbox.bottom, 0);
        let max_corner = IndexedPoint::new(bbox.right, bbox.top, 0);
        let envelope = rstar::AABB::from_corners(min_corner, max_corner);

        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|point| bbox.contains_xy(point.x, point.y))
            .map(|point| point.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn nearest(&self, x: f64, y: f64, k: usize) -> Vec<usize> {
        let query_point = IndexedPoint::new(x, y, 0);
        self.tree
            .nearest_neighbor_iter(&query_point)
            .take(k)
            .map(|point| point.id)
            .collect()
    }

    fn size(&self) -> usize {
        self.tree.size()
    }
}

type IndexedQuadrant = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Rectangle index over quadrant geometries, keyed by row position.
pub struct QuadrantIndex {
    tree: RTree<IndexedQuadrant>,
}

impl QuadrantIndex {
    pub fn new<'a, I>(boxes: I) -> Self
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        let quadrants = boxes
            .into_iter()
            .enumerate()
            .map(|(row, bbox)| {
                let rect = Rectangle::from_corners([bbox.left, bbox.bottom], [bbox.right, bbox.top]);
                GeomWithData::new(rect, row)
            })
            .collect();

        Self {
            tree: RTree::bulk_load(quadrants),
        }
    }
}

impl SpatialIndex for QuadrantIndex {
    fn intersect(&self, bbox: &BBox) -> Vec<usize> {
        let envelope = rstar::AABB::from_corners([bbox.left, bbox.bottom], [bbox.right, bbox.top]);
        let mut rows: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|quadrant| quadrant.data)
            .collect();
        rows.sort_unstable();
        rows
    }

    /// Rows ordered by distance from `(x, y)` to the quadrant rectangle,
    /// zero for a quadrant containing the point.
    fn nearest(&self, x: f64, y: f64, k: usize) -> Vec<usize> {
        self.tree
            .nearest_neighbor_iter(&[x, y])
            .take(k)
            .map(|quadrant| quadrant.data)
            .collect()
    }

    fn size(&self) -> usize {
        self.tree.size()
    }
}
