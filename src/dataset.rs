//! Point dataset: coordinates, categorical attribute columns and a CRS flag.
//!
//! Point identifiers are row positions in the dataset. Every sampler output
//! refers back to these positions.

use crate::compute::validation::validate_points;
use crate::error::{GrtsError, Result};
use geo::Point;
use grts_types::bbox::BBox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coordinate reference system family of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326).
    Geographic,
    /// Planar, linear units.
    #[default]
    Projected,
}

impl Crs {
    /// Padding added around the total bounds before the tree is built.
    pub fn bounds_offset(&self) -> f64 {
        match self {
            Crs::Geographic => 0.5,
            Crs::Projected => 20_000.0,
        }
    }
}

/// An ordered table of points with string attribute columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDataset {
    points: Vec<Point>,
    columns: BTreeMap<String, Vec<String>>,
    crs: Crs,
}

impl PointDataset {
    pub fn new(points: Vec<Point>, crs: Crs) -> Result<Self> {
        validate_points(&points, crs)?;
        Ok(Self {
            points,
            columns: BTreeMap::new(),
            crs,
        })
    }

    /// Build a projected dataset from `(x, y)` pairs.
    pub fn from_xy<I>(coords: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let points = coords.into_iter().map(|(x, y)| Point::new(x, y)).collect();
        Self::new(points, Crs::Projected)
    }

    /// Attach an attribute column. Its length must match the number of points.
    pub fn with_column<S>(mut self, name: impl Into<String>, values: Vec<S>) -> Result<Self>
    where
        S: Into<String>,
    {
        let name = name.into();
        if values.len() != self.points.len() {
            return Err(GrtsError::InvalidInput(format!(
                "column '{}' has {} values for {} points",
                name,
                values.len(),
                self.points.len()
            )));
        }
        self.columns
            .insert(name, values.into_iter().map(Into::into).collect());
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, id: usize) -> Option<&Point> {
        self.points.get(id)
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Value of `column` for point `id`.
    pub fn attribute(&self, id: usize, column: &str) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|values| values.get(id))
            .map(String::as_str)
    }

    /// Tight bounds of all points, `None` for an empty dataset.
    pub fn total_bounds(&self) -> Option<BBox> {
        let first = self.points.first()?;
        let seed = BBox::new(first.x(), first.y(), first.x(), first.y());
        Some(self.points.iter().fold(seed, |acc, p| {
            acc.union(&BBox::new(p.x(), p.y(), p.x(), p.y()))
        }))
    }

    /// Rows at the given identifiers, in the given order.
    pub fn select(&self, ids: &[usize]) -> Result<PointDataset> {
        let mut points = Vec::with_capacity(ids.len());
        for &id in ids {
            let point = self.points.get(id).ok_or_else(|| {
                GrtsError::InvalidInput(format!(
                    "point id {} out of range for {} points",
                    id,
                    self.points.len()
                ))
            })?;
            points.push(*point);
        }

        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let selected = ids.iter().map(|&id| values[id].clone()).collect();
                (name.clone(), selected)
            })
            .collect();

        Ok(PointDataset {
            points,
            columns,
            crs: self.crs,
        })
    }

    /// Identifiers of points whose `column` equals `value`.
    pub fn ids_where(&self, column: &str, value: &str) -> Result<Vec<usize>> {
        let values = self
            .columns
            .get(column)
            .ok_or_else(|| GrtsError::InvalidInput(format!("unknown column '{}'", column)))?;

        Ok(values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.as_str() == value)
            .map(|(id, _)| id)
            .collect())
    }
}
