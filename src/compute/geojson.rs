//! GeoJSON export of quadrant tables and sampled points.

use crate::dataset::PointDataset;
use crate::error::{GrtsError, Result};
use crate::table::QuadRow;
use crate::weighting::WeightedTable;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use grts_types::bbox::BBox;
use serde_json::Map;

fn rectangle(bbox: &BBox) -> Geometry {
    let ring = vec![
        vec![bbox.left, bbox.bottom],
        vec![bbox.right, bbox.bottom],
        vec![bbox.right, bbox.top],
        vec![bbox.left, bbox.top],
        vec![bbox.left, bbox.bottom],
    ];
    Geometry::new(Value::Polygon(vec![ring]))
}

fn feature(geometry: Geometry, props: Map<String, serde_json::Value>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn quadrant_feature(row: &QuadRow) -> Feature {
    let mut props = Map::new();
    props.insert("address".to_string(), row.address.as_str().into());
    props.insert("count".to_string(), row.count.into());
    feature(rectangle(&row.bbox), props)
}

/// One polygon feature per row with `address` and `count` properties.
pub fn quadrants_to_feature_collection(rows: &[QuadRow]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: rows.iter().map(quadrant_feature).collect(),
        foreign_members: None,
    }
}

/// One feature per distinct quadrant of a weighted table, with its
/// `occurrences` and, after cluster weighting, its `cluster` label.
pub fn weighted_to_feature_collection(table: &WeightedTable) -> FeatureCollection {
    let mut features: Vec<Feature> = Vec::new();
    let mut last: Option<&QuadRow> = None;

    for row in table.rows() {
        if last.is_some_and(|prev| prev.address == row.address) {
            continue;
        }
        last = Some(row);

        let mut feature = quadrant_feature(row);
        if let Some(props) = feature.properties.as_mut() {
            props.insert("occurrences".to_string(), table.occurrences(&row.address).into());
            if let Some(label) = table.clusters().and_then(|c| c.labels.get(&row.address)) {
                props.insert("cluster".to_string(), (*label).into());
            }
        }
        features.push(feature);
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Selected points as point features carrying their id and attribute values.
pub fn points_to_feature_collection(dataset: &PointDataset, ids: &[usize]) -> Result<FeatureCollection> {
    let features = ids
        .iter()
        .map(|&id| {
            let point = dataset
                .point(id)
                .ok_or_else(|| GrtsError::InvalidInput(format!("unknown point id {}", id)))?;

            let mut props = Map::new();
            props.insert("id".to_string(), id.into());
            for column in dataset.column_names() {
                if let Some(value) = dataset.attribute(id, column) {
                    props.insert(column.to_string(), value.into());
                }
            }

            let geometry = Geometry::new(Value::Point(vec![point.x(), point.y()]));
            Ok(feature(geometry, props))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Serialize a feature collection to a GeoJSON string.
pub fn to_string(collection: &FeatureCollection) -> Result<String> {
    Ok(serde_json::to_string(collection)?)
}
