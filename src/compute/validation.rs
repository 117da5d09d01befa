//! Validation for point coordinates and quadrant geometry.

use crate::dataset::Crs;
use crate::error::{GrtsError, Result};
use geo::Point;
use grts_types::bbox::BBox;

/// Validates a 2D point has valid longitude and latitude.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use grts::compute::validation::validate_geographic_point;
/// use geo::Point;
///
/// let nyc = Point::new(-74.0060, 40.7128);
/// assert!(validate_geographic_point(&nyc).is_ok());
///
/// let invalid = Point::new(200.0, 40.0);
/// assert!(validate_geographic_point(&invalid).is_err());
/// ```
pub fn validate_geographic_point(point: &Point) -> Result<()> {
    validate_finite_point(point)?;
    let (x, y) = (point.x(), point.y());

    if !(-180.0..=180.0).contains(&x) {
        return Err(GrtsError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(GrtsError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Validates that both coordinates are finite.
pub fn validate_finite_point(point: &Point) -> Result<()> {
    if !point.x().is_finite() {
        return Err(GrtsError::InvalidInput(format!(
            "x coordinate must be finite, got: {}",
            point.x()
        )));
    }

    if !point.y().is_finite() {
        return Err(GrtsError::InvalidInput(format!(
            "y coordinate must be finite, got: {}",
            point.y()
        )));
    }

    Ok(())
}

/// Validates every point for the given coordinate reference system.
pub fn validate_points(points: &[Point], crs: Crs) -> Result<()> {
    for (idx, point) in points.iter().enumerate() {
        let checked = match crs {
            Crs::Geographic => validate_geographic_point(point),
            Crs::Projected => validate_finite_point(point),
        };
        checked.map_err(|e| GrtsError::InvalidInput(format!("Point at index {}: {}", idx, e)))?;
    }
    Ok(())
}

/// Validates that a quadrant has finite, correctly ordered edges.
pub fn validate_bbox(bbox: &BBox) -> Result<()> {
    let edges = [bbox.left, bbox.bottom, bbox.right, bbox.top];
    if !edges.iter().all(|v| v.is_finite()) {
        return Err(GrtsError::InvalidInput(format!(
            "Quadrant edges must be finite: {:?}",
            bbox
        )));
    }

    if bbox.left > bbox.right || bbox.bottom > bbox.top {
        return Err(GrtsError::InvalidInput(format!(
            "Quadrant edges out of order: {:?}",
            bbox
        )));
    }

    Ok(())
}
