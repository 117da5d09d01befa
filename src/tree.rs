//! Hierarchical quadrant grid over a point dataset.
//!
//! The tree starts as one quadrant covering the padded total bounds of the
//! dataset. Every [`QuadTree::split`] replaces the current quadrants with
//! their non-empty children, numbered
//!
//! ```text
//! 1 | 3
//! --|--
//! 0 | 2
//! ```
//!
//! and appended to the parent's base-4 address. Only the current depth is
//! kept; ancestors are discarded.
//!
//! ```rust
//! use grts::{PointDataset, QuadTree, SplitOptions};
//!
//! let coords: Vec<(f64, f64)> = (0..100)
//!     .map(|i| ((i % 10) as f64 * 10_000.0, (i / 10) as f64 * 10_000.0))
//!     .collect();
//! let dataset = PointDataset::from_xy(coords)?;
//!
//! let mut tree = QuadTree::new(&dataset, true)?;
//! tree.split_recursive(&SplitOptions::max_samples(10))?;
//! assert!(tree.counts().values().all(|&c| c <= 10));
//! # Ok::<(), grts::GrtsError>(())
//! ```

use crate::compute::spatial::{RTreeIndex, SpatialIndex};
use crate::config::{SplitOptions, StopRule};
use crate::dataset::PointDataset;
use crate::error::{GrtsError, Result};
use crate::table::{QuadRow, QuadrantTable};
use geo::{Point, Polygon};
use grts_types::address::QuadAddress;
use grts_types::bbox::BBox;
use std::collections::BTreeMap;

/// Axis of a quadrant side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

pub struct QuadTree<'a, I = RTreeIndex> {
    dataset: &'a PointDataset,
    index: I,
    quadrants: Vec<QuadRow>,
    contains_null: bool,
}

impl<'a> QuadTree<'a, RTreeIndex> {
    /// Build the initial quadrant over `dataset`, indexing points with an R*-tree.
    pub fn new(dataset: &'a PointDataset, force_square: bool) -> Result<Self> {
        Self::with_index(dataset, RTreeIndex::from_dataset(dataset), force_square)
    }

    /// The `k` dataset points nearest to each query, as `(query, point id, distance)`.
    pub fn query_points(&self, queries: &[Point], k: usize) -> Vec<(usize, usize, f64)> {
        queries
            .iter()
            .enumerate()
            .flat_map(|(query, p)| {
                self.index
                    .nearest_with_distance(p.x(), p.y(), k)
                    .into_iter()
                    .map(move |(id, distance)| (query, id, distance))
            })
            .collect()
    }
}

impl<'a, I: SpatialIndex> QuadTree<'a, I> {
    /// Build the initial quadrant over `dataset` using a caller-supplied index.
    ///
    /// The total bounds are padded by the CRS offset (0.5 degrees for
    /// geographic data, 20 000 units otherwise). With `force_square` the
    /// shorter side is grown to the longer side's length, anchored at the
    /// top edge when y is short and at the left edge when x is short.
    pub fn with_index(dataset: &'a PointDataset, index: I, force_square: bool) -> Result<Self> {
        let bounds = dataset.total_bounds().ok_or_else(|| {
            GrtsError::InvalidInput("cannot build a quadrant tree over an empty dataset".to_string())
        })?;

        if index.size() != dataset.len() {
            return Err(GrtsError::InvalidInput(format!(
                "index holds {} entries for {} points",
                index.size(),
                dataset.len()
            )));
        }

        let mut root = bounds.expand(dataset.crs().bounds_offset());
        if force_square {
            if root.height() < root.width() {
                root.bottom = root.top - root.width();
            } else {
                root.right = root.left + root.height();
            }
        }

        let count = index.intersect(&root).len();
        log::debug!(
            "Initial quadrant {:?} holds {} of {} points",
            root,
            count,
            dataset.len()
        );

        Ok(Self {
            dataset,
            index,
            quadrants: vec![QuadRow::new(QuadAddress::root(), root, count)],
            contains_null: false,
        })
    }

    pub fn dataset(&self) -> &'a PointDataset {
        self.dataset
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Current quadrants in address order.
    pub fn quadrants(&self) -> &[QuadRow] {
        &self.quadrants
    }

    /// Number of quadrants in the tree.
    pub fn nquads(&self) -> usize {
        self.quadrants.len()
    }

    pub fn len(&self) -> usize {
        self.nquads()
    }

    pub fn is_empty(&self) -> bool {
        self.quadrants.is_empty()
    }

    /// Whether the last split pruned at least one child.
    pub fn contains_null(&self) -> bool {
        self.contains_null
    }

    /// Address length of the current quadrants.
    pub fn depth(&self) -> usize {
        self.quadrants.first().map_or(0, |q| q.address.depth())
    }

    /// Quadrant x side length.
    pub fn qx_len(&self) -> f64 {
        self.quadrants.first().map_or(0.0, |q| q.bbox.width())
    }

    /// Quadrant y side length.
    pub fn qy_len(&self) -> f64 {
        self.quadrants.first().map_or(0.0, |q| q.bbox.height())
    }

    /// The shorter quadrant side.
    pub fn min_qside(&self) -> Axis {
        if self.qy_len() < self.qx_len() {
            Axis::Y
        } else {
            Axis::X
        }
    }

    pub fn qmin(&self) -> f64 {
        self.qx_len().min(self.qy_len())
    }

    pub fn qmax(&self) -> f64 {
        self.qx_len().max(self.qy_len())
    }

    /// Total bounds of the current quadrants.
    pub fn bounds(&self) -> Option<BBox> {
        let mut iter = self.quadrants.iter();
        let first = iter.next()?.bbox;
        Some(iter.fold(first, |acc, q| acc.union(&q.bbox)))
    }

    pub fn geometries(&self) -> Vec<Polygon> {
        self.quadrants.iter().map(|q| q.bbox.to_polygon()).collect()
    }

    /// Point count per quadrant. Quadrants with no points are omitted.
    pub fn counts(&self) -> BTreeMap<QuadAddress, usize> {
        self.quadrants
            .iter()
            .filter(|q| q.count > 0)
            .map(|q| (q.address.clone(), q.count))
            .collect()
    }

    /// Recount the points inside one quadrant, `None` if the address is not in the tree.
    pub fn count(&self, address: &QuadAddress) -> Option<usize> {
        self.quadrants
            .iter()
            .find(|q| &q.address == address)
            .map(|q| self.index.intersect(&q.bbox).len())
    }

    /// Snapshot of the current quadrants.
    pub fn table(&self) -> QuadrantTable {
        let mut rows = self.quadrants.clone();
        rows.sort_by(|a, b| a.address.cmp(&b.address));
        // Siblings differ in their last digit, so addresses are unique.
        QuadrantTable::from_sorted(rows)
    }

    /// Split every quadrant into four and keep children holding more than
    /// `thresh` points.
    pub fn split(&mut self, thresh: usize) -> &mut Self {
        let mut next = Vec::with_capacity(self.quadrants.len() * 4);
        self.contains_null = false;

        for quad in &self.quadrants {
            for (child_index, child) in (0u8..).zip(quad.bbox.children()) {
                let count = self.index.intersect(&child).len();
                if count > 0 && count > thresh {
                    next.push(QuadRow::new(quad.address.child(child_index), child, count));
                } else {
                    self.contains_null = true;
                }
            }
        }

        log::debug!(
            "Split {} quadrants into {} (depth {}, pruned: {})",
            self.quadrants.len(),
            next.len(),
            self.depth() + 1,
            self.contains_null
        );

        self.quadrants = next;
        self
    }

    /// Split repeatedly until the stopping rule in `options` is met.
    ///
    /// Returns the number of splits performed. Fails with
    /// [`GrtsError::InvalidConfig`] when no stopping rule is chosen.
    pub fn split_recursive(&mut self, options: &SplitOptions) -> Result<usize> {
        let rule = options.stop_rule()?;
        let mut previous_max = usize::MAX;
        let mut splits = 0;

        loop {
            self.split(options.min_thresh);
            splits += 1;

            if self.quadrants.is_empty() {
                log::warn!(
                    "Every quadrant was pruned at depth {} (min_thresh = {})",
                    splits,
                    options.min_thresh
                );
                break;
            }

            match rule {
                StopRule::FirstNull => {
                    if self.contains_null {
                        break;
                    }
                }
                StopRule::MaxLength(max_length) => {
                    let longest_min_side = self
                        .quadrants
                        .iter()
                        .map(|q| q.bbox.min_side())
                        .fold(0.0, f64::max);
                    if longest_min_side <= max_length {
                        break;
                    }
                }
                StopRule::MaxSamples(max_samples) => {
                    let max_count = self.quadrants.iter().map(|q| q.count).max().unwrap_or(0);
                    if max_count <= max_samples {
                        break;
                    }
                    // Saturated quadrant: further splits cannot thin it out
                    if max_count >= previous_max {
                        break;
                    }
                    previous_max = max_count;
                }
            }
        }

        log::info!(
            "Recursive split stopped after {} splits with {} quadrants ({:?})",
            splits,
            self.quadrants.len(),
            rule
        );
        Ok(splits)
    }
}
